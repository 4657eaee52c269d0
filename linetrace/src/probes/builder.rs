//! Probe set construction across all compile units

use log::{debug, info};
use std::collections::{BTreeSet, HashSet};

use super::line_walker::walk_line_program;
use super::range_resolver::{resolve_function_ranges, RequestedFunctions};
use crate::debuginfo::{DebugSource, UnitSource};
use crate::domain::{BuildError, ProbeDescriptor};

/// Build the ordered, duplicate-free probe set for `functions`
///
/// Every compile unit is visited before completeness is judged, since a
/// function absent from one unit may be defined in another. A unit without a
/// line program is only an error if it defines a requested function.
///
/// # Errors
/// Returns [`BuildError::FunctionsNotFound`] naming every requested function
/// that produced no probe, or the first range/line decoding error.
pub fn build_probe_set<S>(
    source: &S,
    functions: &[String],
) -> Result<Vec<ProbeDescriptor>, BuildError>
where
    S: DebugSource + ?Sized,
{
    let requested = RequestedFunctions::new(functions);
    let mut missing: BTreeSet<&str> = functions.iter().map(String::as_str).collect();
    let mut probes = Vec::new();

    source.for_each_unit(&mut |unit: &dyn UnitSource| {
        let index = resolve_function_ranges(unit, &requested)?;
        if index.is_empty() {
            return Ok(());
        }

        let unit_probes = walk_line_program(unit, &index)?;
        debug!(
            "{}: {} ranges in {} functions, {} statement rows",
            unit.name(),
            index.ranges().len(),
            index.functions().len(),
            unit_probes.len()
        );

        for probe in &unit_probes {
            missing.remove(probe.function_name.as_str());
        }
        probes.extend(unit_probes);
        Ok(())
    })?;

    if !missing.is_empty() {
        return Err(BuildError::FunctionsNotFound(missing.into_iter().map(String::from).collect()));
    }

    let total = probes.len();
    let probes = dedup_probes(probes);
    info!("Built {} probes ({} duplicate identifiers dropped)", probes.len(), total - probes.len());
    Ok(probes)
}

/// Keep the first probe for each identifier, preserving order
#[must_use]
pub fn dedup_probes(probes: Vec<ProbeDescriptor>) -> Vec<ProbeDescriptor> {
    let mut seen = HashSet::new();
    probes.into_iter().filter(|probe| seen.insert(probe.identifier.clone())).collect()
}
