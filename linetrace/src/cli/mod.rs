//! Command-line interface for linetrace

pub mod args;

pub use args::Args;
