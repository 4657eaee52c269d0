//! Domain types providing compile-time safety and self-documentation
//!
//! Functions are owned by a per-unit arena and referenced from their ranges by
//! [`FunctionId`], so one function split over several address ranges keeps a
//! single identity and a single base address.

use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// Index of a [`Function`] in the arena that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub usize);

/// A requested function as found in the debug information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    /// Lowest base observed for this function; probe offsets are relative to it
    pub base_address: u64,
}

/// One contiguous instruction range `[begin, end)` of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionRange {
    pub function: FunctionId,
    pub begin: u64,
    pub end: u64,
}

impl FunctionRange {
    pub fn new(function: FunctionId, span: Range<u64>) -> Self {
        Self {
            function,
            begin: span.start,
            end: span.end,
        }
    }

    /// Check if an address falls within this range
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.begin && addr < self.end
    }

    #[must_use]
    pub fn span(&self) -> u64 {
        self.end.saturating_sub(self.begin)
    }
}

impl fmt::Display for FunctionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:x}, 0x{:x})", self.begin, self.end)
    }
}

/// A dynamic probe to be placed at `function_name+offset`
///
/// `identifier` only ever contains ASCII alphanumerics and underscores; see
/// [`crate::probes::probe_identifier`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProbeDescriptor {
    pub identifier: String,
    pub function_name: String,
    pub offset: u64,
}

impl ProbeDescriptor {
    /// Probe definition in `kprobe_events` syntax, without the trailing newline
    #[must_use]
    pub fn definition(&self) -> String {
        format!("p:{} {}+0x{:x}", self.identifier, self.function_name, self.offset)
    }

    /// Removal directive in `kprobe_events` syntax, without the trailing newline
    #[must_use]
    pub fn removal(&self) -> String {
        format!("-:{}", self.identifier)
    }
}

impl fmt::Display for ProbeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}+0x{:x})", self.identifier, self.function_name, self.offset)
    }
}

/// A probe the kernel accepted
///
/// Only [`crate::session::ProbeSession`] creates these, so holding one means
/// the probe is live until the session tears it down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledProbe {
    descriptor: ProbeDescriptor,
}

impl InstalledProbe {
    pub(crate) fn new(descriptor: ProbeDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn identifier(&self) -> &str {
        &self.descriptor.identifier
    }

    pub fn descriptor(&self) -> &ProbeDescriptor {
        &self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_range_contains() {
        let range = FunctionRange::new(FunctionId(0), 0x1000..0x1020);

        assert!(range.contains(0x1000));
        assert!(range.contains(0x101f));
        assert!(!range.contains(0x0fff));
        assert!(!range.contains(0x1020));
        assert_eq!(range.span(), 0x20);
    }

    #[test]
    fn test_function_range_display() {
        let range = FunctionRange::new(FunctionId(3), 0x2000..0x2010);
        assert_eq!(range.to_string(), "[0x2000, 0x2010)");
    }

    #[test]
    fn test_probe_definition_syntax() {
        let probe = ProbeDescriptor {
            identifier: "foo_c_L42_C3_0x1010".to_string(),
            function_name: "do_foo".to_string(),
            offset: 0x10,
        };
        assert_eq!(probe.definition(), "p:foo_c_L42_C3_0x1010 do_foo+0x10");
        assert_eq!(probe.removal(), "-:foo_c_L42_C3_0x1010");
    }

    #[test]
    fn test_probe_serializes_to_json() {
        let probe = ProbeDescriptor {
            identifier: "a_c_L1_C0_0x10".to_string(),
            function_name: "a".to_string(),
            offset: 0,
        };
        let json = serde_json::to_value(&probe).unwrap();
        assert_eq!(json["identifier"], "a_c_L1_C0_0x10");
        assert_eq!(json["function_name"], "a");
        assert_eq!(json["offset"], 0);
    }
}
