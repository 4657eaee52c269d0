//! Structured error types for linetrace
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Per-probe kernel rejections are not errors at this level; they are carried
//! in the session reports.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Fatal errors raised while building the probe set, before any kernel state changes
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("No DWARF debug information found (missing or empty .debug_info)")]
    NoDebugInfo,

    #[error("Malformed address range for function {function}: {reason}")]
    MalformedRange {
        function: String,
        reason: &'static str,
    },

    #[error("Compile unit {unit} defines requested functions but has no line program")]
    MissingLineProgram { unit: String },

    #[error("Functions not found: {}", .0.join(", "))]
    FunctionsNotFound(Vec<String>),

    #[error("Failed to decode DWARF: {0}")]
    Decode(#[from] gimli::Error),

    #[error("Failed to parse object file: {0}")]
    Object(#[from] object::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors from the probe session that are not tied to a single probe
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot open probe control interface {}: {source}", path.display())]
    ControlUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No probes were accepted by the kernel")]
    NoProbesInstalled,

    #[error("Failed to run {program}: {source}")]
    CaptureSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    CaptureFailed { program: String, status: ExitStatus },
}
