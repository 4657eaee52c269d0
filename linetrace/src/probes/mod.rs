//! # Probe Set Construction
//!
//! Turns debug information into one kprobe per source statement of the
//! requested functions.
//!
//! ```text
//! for each compile unit:
//!     range_resolver   DW_TAG_subprogram -> [begin, end) per function
//!     line_walker      is_stmt rows inside those ranges -> ProbeDescriptor
//! builder              merge, check every function matched, dedup
//! ```
//!
//! Probe names encode the source location and address:
//!
//! ```text
//! fs/read_write.c:482:9 @ 0xffffffff8131b9a4
//!   -> read_write_c_L482_C9_0xffffffff8131b9a4
//! ```

pub mod builder;
pub mod line_walker;
pub mod range_resolver;

pub use builder::{build_probe_set, dedup_probes};
pub use line_walker::{probe_identifier, sanitize_file_name, walk_line_program};
pub use range_resolver::{resolve_function_ranges, FunctionIndex, RequestedFunctions};
