use gimli::{EndianRcSlice, Reader, RunTimeEndian};
use log::{debug, trace};
use object::{Object, ObjectSection};
use std::borrow::Cow;
use std::fs;
use std::num::NonZeroU64;
use std::ops::Range;
use std::path::Path;
use std::rc::Rc;

use super::{DebugSource, HighPc, LineRow, Subprogram, UnitSource};
use crate::domain::BuildError;

/// Reader type used for every section of a loaded binary
pub type DwarfReader = EndianRcSlice<RunTimeEndian>;

/// DWARF debug information of an ELF binary, decoded with `gimli`
pub struct DwarfDebugInfo {
    dwarf: gimli::Dwarf<DwarfReader>,
}

impl DwarfDebugInfo {
    /// Load the debug information of the binary at `path`
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or carries no DWARF
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BuildError> {
        let data = fs::read(path.as_ref())?;
        debug!("Read {} ({} MB)", path.as_ref().display(), data.len() / (1024 * 1024));
        Self::parse(&data)
    }

    /// Parse an in-memory ELF image
    ///
    /// # Errors
    /// Returns an error if the object cannot be parsed or has no `.debug_info`
    pub fn parse(data: &[u8]) -> Result<Self, BuildError> {
        let obj_file = object::File::parse(data)?;

        if !obj_file.section_by_name(".debug_info").is_some_and(|s| s.size() > 0) {
            return Err(BuildError::NoDebugInfo);
        }

        let endian =
            if obj_file.is_little_endian() { RunTimeEndian::Little } else { RunTimeEndian::Big };

        let load_section = |id: gimli::SectionId| -> Result<DwarfReader, gimli::Error> {
            let data = obj_file
                .section_by_name(id.name())
                .and_then(|section| section.uncompressed_data().ok())
                .unwrap_or(Cow::Borrowed(&[][..]));
            Ok(EndianRcSlice::new(Rc::from(&*data), endian))
        };

        let dwarf = gimli::Dwarf::load(&load_section)?;
        Ok(Self::from_dwarf(dwarf))
    }

    /// Wrap already loaded DWARF sections
    #[must_use]
    pub fn from_dwarf(dwarf: gimli::Dwarf<DwarfReader>) -> Self {
        Self { dwarf }
    }
}

impl DebugSource for DwarfDebugInfo {
    fn for_each_unit(
        &self,
        visit: &mut dyn FnMut(&dyn UnitSource) -> Result<(), BuildError>,
    ) -> Result<(), BuildError> {
        let mut units = self.dwarf.units();
        let mut count = 0usize;
        while let Some(header) = units.next()? {
            let unit = self.dwarf.unit(header)?;
            visit(&DwarfUnit {
                dwarf: &self.dwarf,
                unit,
            })?;
            count += 1;
        }
        debug!("Visited {count} compile units");
        Ok(())
    }
}

/// One decoded compile unit
struct DwarfUnit<'a> {
    dwarf: &'a gimli::Dwarf<DwarfReader>,
    unit: gimli::Unit<DwarfReader>,
}

impl DwarfUnit<'_> {
    fn read_subprogram(
        &self,
        entry: &gimli::DebuggingInformationEntry<'_, '_, DwarfReader>,
    ) -> Result<Subprogram, BuildError> {
        let name = match entry.attr_value(gimli::constants::DW_AT_name)? {
            Some(value) => {
                let raw = self.dwarf.attr_string(&self.unit, value)?;
                Some(raw.to_slice()?.into_owned())
            }
            None => None,
        };

        let low_pc = match entry.attr_value(gimli::constants::DW_AT_low_pc)? {
            Some(value) => self.dwarf.attr_address(&self.unit, value)?,
            None => None,
        };

        let high_pc = match entry.attr_value(gimli::constants::DW_AT_high_pc)? {
            Some(gimli::AttributeValue::Addr(end)) => Some(HighPc::Address(end)),
            Some(gimli::AttributeValue::DebugAddrIndex(index)) => {
                Some(HighPc::Address(self.dwarf.address(&self.unit, index)?))
            }
            Some(value) => value.udata_value().map(HighPc::Size),
            None => None,
        };

        let ranges = match entry.attr_value(gimli::constants::DW_AT_ranges)? {
            Some(value) => self.dwarf.attr_ranges_offset(&self.unit, value)?.map(|offset| offset.0),
            None => None,
        };

        Ok(Subprogram {
            name,
            inline: entry.attr(gimli::constants::DW_AT_inline)?.is_some(),
            declaration: entry.attr(gimli::constants::DW_AT_declaration)?.is_some(),
            low_pc,
            high_pc,
            ranges,
        })
    }
}

impl UnitSource for DwarfUnit<'_> {
    fn name(&self) -> String {
        self.unit
            .name
            .as_ref()
            .and_then(|name| name.to_string_lossy().ok().map(Cow::into_owned))
            .unwrap_or_else(|| "<unnamed>".to_string())
    }

    // Kernel code has no function definitions nested below the unit root, so
    // only the root's direct children are inspected.
    fn subprograms(&self) -> Result<Vec<Subprogram>, BuildError> {
        let mut tree = self.unit.entries_tree(None)?;
        let root = tree.root()?;
        let mut children = root.children();

        let mut subprograms = Vec::new();
        while let Some(child) = children.next()? {
            let entry = child.entry();
            if entry.tag() == gimli::constants::DW_TAG_subprogram {
                subprograms.push(self.read_subprogram(entry)?);
            }
        }
        Ok(subprograms)
    }

    fn range_list(&self, offset: usize) -> Result<Vec<Range<u64>>, BuildError> {
        let mut iter = self.dwarf.ranges(&self.unit, gimli::RangeListsOffset(offset))?;

        let mut ranges = Vec::new();
        while let Some(range) = iter.next()? {
            if range.begin < range.end {
                ranges.push(range.begin..range.end);
            } else {
                trace!("Dropping empty range 0x{:x}-0x{:x}", range.begin, range.end);
            }
        }
        Ok(ranges)
    }

    fn line_rows(&self) -> Result<Option<Vec<LineRow>>, BuildError> {
        let Some(program) = self.unit.line_program.clone() else {
            return Ok(None);
        };

        let mut rows = program.rows();
        let mut out = Vec::new();
        while let Some((_, row)) = rows.next_row()? {
            let column = match row.column() {
                gimli::ColumnType::LeftEdge => 0,
                gimli::ColumnType::Column(column) => column.get(),
            };
            out.push(LineRow {
                address: row.address(),
                is_stmt: row.is_stmt(),
                end_sequence: row.end_sequence(),
                file_index: row.file_index(),
                line: row.line().map_or(0, NonZeroU64::get),
                column,
            });
        }
        Ok(Some(out))
    }

    fn file_name(&self, file_index: u64) -> Result<Option<String>, BuildError> {
        let Some(program) = self.unit.line_program.as_ref() else {
            return Ok(None);
        };
        // The header knows whether indices are 1-based (DWARF 4) or 0-based (DWARF 5)
        let Some(file) = program.header().file(file_index) else {
            return Ok(None);
        };
        let name = self.dwarf.attr_string(&self.unit, file.path_name())?;
        Ok(Some(name.to_string_lossy()?.into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_garbage() {
        let result = DwarfDebugInfo::parse(b"definitely not an ELF file");
        assert!(matches!(result, Err(BuildError::Object(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = DwarfDebugInfo::from_path("/nonexistent/vmlinux");
        assert!(matches!(result, Err(BuildError::Io(_))));
    }
}
