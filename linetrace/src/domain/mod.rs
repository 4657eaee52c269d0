//! Domain model for linetrace
//!
//! This module contains core domain types and errors that provide:
//! - Shared function identity across fragmented address ranges
//! - Probe descriptors in kernel probe syntax
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{Function, FunctionId, FunctionRange, InstalledProbe, ProbeDescriptor};

pub use errors::{BuildError, SessionError};
