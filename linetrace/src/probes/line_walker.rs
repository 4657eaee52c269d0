//! Statement-boundary enumeration over a unit's line-number program

use log::{trace, warn};
use std::collections::HashMap;

use super::range_resolver::FunctionIndex;
use crate::debuginfo::UnitSource;
use crate::domain::{BuildError, ProbeDescriptor};

/// Replace every character the kernel rejects in event names with `_`
///
/// This is wider than swapping `.` and `-` alone: `a+b.c` becomes `a_b_c`,
/// and since event names must start with a letter or underscore, a leading
/// digit gets an extra `_` in front (`9p.c` becomes `_9p_c`, not `9p_c`).
#[must_use]
pub fn sanitize_file_name(file_name: &str) -> String {
    let mut sanitized: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

/// Probe name for a source location, e.g. `foo_c_L42_C3_0x1010`
///
/// The address suffix keeps names unique when several rows share a
/// file/line/column.
#[must_use]
pub fn probe_identifier(file_name: &str, line: u64, column: u64, address: u64) -> String {
    format!("{}_L{line}_C{column}_0x{address:x}", sanitize_file_name(file_name))
}

/// Emit one probe per statement row that lands inside a known function range
///
/// Rows are visited in program order; duplicates are left for the caller.
///
/// # Errors
/// Returns [`BuildError::MissingLineProgram`] if the unit has no line program,
/// and propagates decoding errors.
pub fn walk_line_program(
    unit: &dyn UnitSource,
    index: &FunctionIndex,
) -> Result<Vec<ProbeDescriptor>, BuildError> {
    let rows = unit
        .line_rows()?
        .ok_or_else(|| BuildError::MissingLineProgram { unit: unit.name() })?;

    let mut file_names: HashMap<u64, String> = HashMap::new();
    let mut probes = Vec::new();

    for row in rows {
        if !row.is_stmt || row.end_sequence {
            continue;
        }
        let Some(range) = index.find(row.address) else {
            continue;
        };
        let function = index.function(range.function);

        let Some(offset) = row.address.checked_sub(function.base_address) else {
            // Only possible when a range list does not start at its lowest range
            warn!(
                "{}: 0x{:x} lies below base 0x{:x}, skipping",
                function.name, row.address, function.base_address
            );
            continue;
        };

        if !file_names.contains_key(&row.file_index) {
            let name = unit.file_name(row.file_index)?.unwrap_or_else(|| {
                trace!("No file entry {} in {}", row.file_index, unit.name());
                "unknown".to_string()
            });
            file_names.insert(row.file_index, name);
        }
        let file_name = &file_names[&row.file_index];

        probes.push(ProbeDescriptor {
            identifier: probe_identifier(file_name, row.line, row.column, row.address),
            function_name: function.name.clone(),
            offset,
        });
    }

    Ok(probes)
}
