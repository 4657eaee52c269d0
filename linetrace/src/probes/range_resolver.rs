//! Function range resolution for one compile unit
//!
//! Maps each requested function to the instruction ranges its top-level
//! `DW_TAG_subprogram` entries cover.

use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use std::ops::Range;

use crate::debuginfo::UnitSource;
use crate::domain::{BuildError, Function, FunctionId, FunctionRange};

/// Requested function names, keyed by the raw bytes of `DW_AT_name`
#[derive(Debug, Clone, Default)]
pub struct RequestedFunctions(HashSet<Vec<u8>>);

impl RequestedFunctions {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(names.into_iter().map(|name| name.as_ref().as_bytes().to_vec()).collect())
    }

    #[must_use]
    pub fn contains(&self, name: &[u8]) -> bool {
        self.0.contains(name)
    }
}

/// Functions of one compile unit and their ranges
#[derive(Debug, Default)]
pub struct FunctionIndex {
    functions: Vec<Function>,
    by_name: HashMap<String, FunctionId>,
    ranges: Vec<FunctionRange>,
}

impl FunctionIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record ranges for `name`, lowering the function's base to `base` if smaller
    pub fn insert<I>(&mut self, name: &str, base: u64, spans: I)
    where
        I: IntoIterator<Item = Range<u64>>,
    {
        let id = match self.by_name.get(name) {
            Some(&id) => {
                let function = &mut self.functions[id.0];
                function.base_address = function.base_address.min(base);
                id
            }
            None => {
                let id = FunctionId(self.functions.len());
                self.functions.push(Function {
                    name: name.to_string(),
                    base_address: base,
                });
                self.by_name.insert(name.to_string(), id);
                id
            }
        };

        for span in spans {
            let range = FunctionRange::new(id, span);
            trace!("{name}: {range}");
            self.ranges.push(range);
        }
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0]
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn ranges(&self) -> &[FunctionRange] {
        &self.ranges
    }

    /// First range containing `addr`
    ///
    /// Ranges of different functions do not overlap in well-formed input, so
    /// a linear first-match search is unambiguous.
    pub fn find(&self, addr: u64) -> Option<&FunctionRange> {
        self.ranges.iter().find(|range| range.contains(addr))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// Find every range of the requested functions defined in `unit`
///
/// A function with a range list takes the first listed entry as its base
/// address, in whatever order the producer emitted the list.
///
/// An empty index is not an error: the function may live in another unit.
///
/// # Errors
/// Returns [`BuildError::MalformedRange`] when a matching subprogram has both
/// or neither of a `low_pc`/`high_pc` pair and a range list, and propagates
/// decoding errors.
pub fn resolve_function_ranges(
    unit: &dyn UnitSource,
    requested: &RequestedFunctions,
) -> Result<FunctionIndex, BuildError> {
    let mut index = FunctionIndex::new();

    for subprogram in unit.subprograms()? {
        if subprogram.inline || subprogram.declaration {
            continue;
        }
        let Some(raw_name) = subprogram.name.as_deref() else {
            continue;
        };
        if !requested.contains(raw_name) {
            continue;
        }
        let name = String::from_utf8_lossy(raw_name);

        match (subprogram.low_pc.zip(subprogram.high_pc), subprogram.ranges) {
            (Some((low, high)), None) => {
                index.insert(&name, low, [low..high.end(low)]);
            }
            (None, Some(offset)) => {
                let spans = unit.range_list(offset)?;
                match spans.first().map(|first| first.start) {
                    Some(base) => index.insert(&name, base, spans),
                    None => debug!("{name}: range list at 0x{offset:x} is empty"),
                }
            }
            (Some(_), Some(_)) => {
                return Err(BuildError::MalformedRange {
                    function: name.into_owned(),
                    reason: "both DW_AT_low_pc/DW_AT_high_pc and DW_AT_ranges present",
                });
            }
            (None, None) => {
                return Err(BuildError::MalformedRange {
                    function: name.into_owned(),
                    reason: "no DW_AT_low_pc/DW_AT_high_pc or DW_AT_ranges",
                });
            }
        }
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debuginfo::testing::FakeUnit;
    use crate::debuginfo::{HighPc, Subprogram};

    fn requested(names: &[&str]) -> RequestedFunctions {
        RequestedFunctions::new(names)
    }

    fn named(name: &str) -> Subprogram {
        Subprogram { name: Some(name.as_bytes().to_vec()), ..Subprogram::default() }
    }

    #[test]
    fn test_low_high_pair_is_size_encoded() {
        let unit = FakeUnit::new("foo.c").with_function("foo", 0x1000, 0x20);

        let index = resolve_function_ranges(&unit, &requested(&["foo"])).unwrap();

        assert_eq!(index.ranges().len(), 1);
        let range = index.ranges()[0];
        assert_eq!((range.begin, range.end), (0x1000, 0x1020));
        assert_eq!(index.function(range.function).base_address, 0x1000);
        assert_eq!(index.function(range.function).name, "foo");
    }

    #[test]
    fn test_range_list_shares_one_function() {
        let mut unit = FakeUnit::new("bar.c");
        unit.subprograms.push(Subprogram { ranges: Some(0x40), ..named("bar") });
        unit.range_lists.insert(0x40, vec![0x2000..0x2010, 0x3000..0x3020]);

        let index = resolve_function_ranges(&unit, &requested(&["bar"])).unwrap();

        assert_eq!(index.ranges().len(), 2);
        assert_eq!(index.functions().len(), 1);
        assert_eq!(index.ranges()[0].function, index.ranges()[1].function);
        assert_eq!(index.functions()[0].base_address, 0x2000);
    }

    #[test]
    fn test_range_list_base_is_first_entry_not_lowest() {
        let mut unit = FakeUnit::new("bar.c");
        unit.subprograms.push(Subprogram { ranges: Some(0), ..named("bar") });
        unit.range_lists.insert(0, vec![0x3000..0x3020, 0x2000..0x2010]);

        let index = resolve_function_ranges(&unit, &requested(&["bar"])).unwrap();

        assert_eq!(index.functions()[0].base_address, 0x3000);
    }

    #[test]
    fn test_inline_and_declarations_are_skipped() {
        let mut unit = FakeUnit::new("foo.c");
        unit.subprograms.push(Subprogram { inline: true, ..named("foo") });
        unit.subprograms.push(Subprogram { declaration: true, ..named("foo") });

        let index = resolve_function_ranges(&unit, &requested(&["foo"])).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_unrequested_and_anonymous_entries_are_skipped() {
        let mut unit = FakeUnit::new("foo.c").with_function("other", 0x1000, 0x10);
        unit.subprograms.push(Subprogram::default());

        let index = resolve_function_ranges(&unit, &requested(&["foo"])).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_both_encodings_is_malformed() {
        let mut unit = FakeUnit::new("foo.c");
        unit.subprograms.push(Subprogram {
            low_pc: Some(0x1000),
            high_pc: Some(HighPc::Size(0x10)),
            ranges: Some(0),
            ..named("foo")
        });

        let err = resolve_function_ranges(&unit, &requested(&["foo"])).unwrap_err();
        assert!(
            matches!(err, BuildError::MalformedRange { ref function, .. } if function == "foo")
        );
    }

    #[test]
    fn test_no_encoding_is_malformed() {
        let mut unit = FakeUnit::new("foo.c");
        unit.subprograms.push(named("foo"));

        let err = resolve_function_ranges(&unit, &requested(&["foo"])).unwrap_err();
        assert!(matches!(err, BuildError::MalformedRange { .. }));
    }

    #[test]
    fn test_malformed_unrequested_entry_is_ignored() {
        let mut unit = FakeUnit::new("foo.c");
        unit.subprograms.push(named("unrelated"));

        assert!(resolve_function_ranges(&unit, &requested(&["foo"])).unwrap().is_empty());
    }

    #[test]
    fn test_repeated_entries_keep_lowest_base() {
        let unit = FakeUnit::new("foo.c")
            .with_function("foo", 0x5000, 0x10)
            .with_function("foo", 0x4000, 0x10);

        let index = resolve_function_ranges(&unit, &requested(&["foo"])).unwrap();

        assert_eq!(index.functions().len(), 1);
        assert_eq!(index.functions()[0].base_address, 0x4000);
        assert_eq!(index.ranges().len(), 2);
    }

    #[test]
    fn test_find_is_first_match() {
        let unit = FakeUnit::new("foo.c")
            .with_function("foo", 0x1000, 0x20)
            .with_function("bar", 0x2000, 0x20);
        let index = resolve_function_ranges(&unit, &requested(&["foo", "bar"])).unwrap();

        let hit = index.find(0x2004).unwrap();
        assert_eq!(index.function(hit.function).name, "bar");
        assert!(index.find(0x1020).is_none());
    }
}
