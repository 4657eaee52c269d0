//! # Debug Information Access
//!
//! The probe builder never talks to a DWARF library directly. It sees the
//! debug information through two small traits:
//!
//! - [`DebugSource`]: visits every compile unit in the container
//! - [`UnitSource`]: one compile unit's top-level subprograms, its range-list
//!   table and its line-number program
//!
//! [`dwarf::DwarfDebugInfo`] implements them on top of `gimli` and `object`
//! for an ELF file such as `vmlinux`.
//!
//! ## What a subprogram looks like
//!
//! ```text
//! DW_TAG_subprogram
//!   DW_AT_name      "tcp_sendmsg"
//!   DW_AT_low_pc    0xffffffff81a3b2c0
//!   DW_AT_high_pc   0x5c              <- usually a size, not an end address
//!
//! DW_TAG_subprogram
//!   DW_AT_name      "vfs_read"
//!   DW_AT_ranges    0x1c40            <- cold/hot split: several ranges
//! ```

use std::ops::Range;

use crate::domain::BuildError;

pub mod dwarf;

pub use dwarf::DwarfDebugInfo;

/// Encoding of `DW_AT_high_pc`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighPc {
    /// Constant class: size in bytes from `low_pc`
    Size(u64),
    /// Address class: absolute end address
    Address(u64),
}

impl HighPc {
    /// End address of the range starting at `low_pc`
    #[must_use]
    pub fn end(self, low_pc: u64) -> u64 {
        match self {
            HighPc::Size(size) => low_pc.saturating_add(size),
            HighPc::Address(end) => end,
        }
    }
}

/// The attributes of a top-level `DW_TAG_subprogram` the range resolver needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subprogram {
    /// Raw `DW_AT_name` bytes, as stored in the string table
    pub name: Option<Vec<u8>>,
    /// Carries `DW_AT_inline`
    pub inline: bool,
    /// Carries `DW_AT_declaration`
    pub declaration: bool,
    pub low_pc: Option<u64>,
    pub high_pc: Option<HighPc>,
    /// Offset of the entry's range list (`DW_AT_ranges`)
    pub ranges: Option<usize>,
}

/// One row of a line-number program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRow {
    pub address: u64,
    pub is_stmt: bool,
    pub end_sequence: bool,
    pub file_index: u64,
    /// 0 when the row has no line
    pub line: u64,
    /// 0 for the left edge
    pub column: u64,
}

/// Read access to one compile unit
pub trait UnitSource {
    /// Human readable unit name for diagnostics
    fn name(&self) -> String;

    /// Direct children of the unit root that are subprograms, in DIE order
    ///
    /// # Errors
    /// Returns an error if the entries cannot be decoded
    fn subprograms(&self) -> Result<Vec<Subprogram>, BuildError>;

    /// Resolve the range list at `offset` into absolute address ranges
    ///
    /// # Errors
    /// Returns an error if the range list cannot be decoded
    fn range_list(&self, offset: usize) -> Result<Vec<Range<u64>>, BuildError>;

    /// All rows of the unit's line program, in program order, or `None` if the
    /// unit has no line program
    ///
    /// # Errors
    /// Returns an error if the line program cannot be decoded
    fn line_rows(&self) -> Result<Option<Vec<LineRow>>, BuildError>;

    /// File name for a line-program file index
    ///
    /// # Errors
    /// Returns an error if the file entry's name cannot be read
    fn file_name(&self, file_index: u64) -> Result<Option<String>, BuildError>;
}

/// A container of compile units
pub trait DebugSource {
    /// Call `visit` for every compile unit, stopping at the first error
    ///
    /// # Errors
    /// Returns the first error from decoding a unit header or from `visit`
    fn for_each_unit(
        &self,
        visit: &mut dyn FnMut(&dyn UnitSource) -> Result<(), BuildError>,
    ) -> Result<(), BuildError>;
}
