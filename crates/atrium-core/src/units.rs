//! Unit naming convention and the unit → primitive registry
//!
//! Addressable primitives are named `{unit}_{fragment}`, e.g. `23_4`.
//! Anything else, including decorative objects whose names carry an
//! exclusion token, belongs to no unit.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::ops::RangeInclusive;

use crate::config::HighlightConfig;

pub type UnitId = u32;

/// Parses primitive names into unit ids
#[derive(Debug, Clone)]
pub struct UnitNaming {
    exclusions: Vec<String>,
    range: RangeInclusive<UnitId>,
}

impl UnitNaming {
    pub fn new(exclusions: Vec<String>, range: RangeInclusive<UnitId>) -> Self {
        Self { exclusions, range }
    }

    pub fn from_config(config: &HighlightConfig) -> Self {
        Self::new(config.exclusions.clone(), config.unit_min..=config.unit_max)
    }

    /// Unit id for a primitive name, if it follows the convention
    pub fn resolve(&self, name: &str) -> Option<UnitId> {
        if self.exclusions.iter().any(|token| name.contains(token.as_str())) {
            return None;
        }
        let (unit, fragment) = name.trim().split_once('_')?;
        if unit.is_empty()
            || fragment.is_empty()
            || !unit.bytes().all(|b| b.is_ascii_digit())
            || !fragment.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let unit: UnitId = unit.parse().ok()?;
        self.range.contains(&unit).then_some(unit)
    }
}

/// Mapping unit id → primitives, with the inverse lookup
///
/// A primitive belongs to at most one unit; registering it again moves it.
#[derive(Debug, Clone)]
pub struct UnitRegistry<P> {
    by_unit: BTreeMap<UnitId, Vec<P>>,
    by_primitive: HashMap<P, UnitId>,
}

impl<P> Default for UnitRegistry<P> {
    fn default() -> Self {
        Self {
            by_unit: BTreeMap::new(),
            by_primitive: HashMap::new(),
        }
    }
}

impl<P: Clone + Eq + Hash> UnitRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, unit: UnitId, primitive: P) {
        if let Some(previous) = self.by_primitive.insert(primitive.clone(), unit) {
            if previous == unit {
                return;
            }
            if let Some(list) = self.by_unit.get_mut(&previous) {
                list.retain(|p| *p != primitive);
                if list.is_empty() {
                    self.by_unit.remove(&previous);
                }
            }
        }
        self.by_unit.entry(unit).or_default().push(primitive);
    }

    pub fn unit_of(&self, primitive: &P) -> Option<UnitId> {
        self.by_primitive.get(primitive).copied()
    }

    pub fn primitives(&self, unit: UnitId) -> &[P] {
        self.by_unit.get(&unit).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, primitive: &P) -> bool {
        self.by_primitive.contains_key(primitive)
    }

    /// Registered unit ids in ascending order
    pub fn units(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.by_unit.keys().copied()
    }

    /// Number of registered primitives
    pub fn len(&self) -> usize {
        self.by_primitive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_primitive.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_unit.clear();
        self.by_primitive.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naming() -> UnitNaming {
        UnitNaming::from_config(&HighlightConfig::default())
    }

    #[test]
    fn test_resolves_unit_fragment_names() {
        let n = naming();
        assert_eq!(n.resolve("23_4"), Some(23));
        assert_eq!(n.resolve("1_0"), Some(1));
        assert_eq!(n.resolve("69_12"), Some(69));
    }

    #[test]
    fn test_rejects_non_conforming_names() {
        let n = naming();
        for name in [
            "Cars_12", "human_3", "Site_1", "12_Cars", "Wall", "23", "23_", "_4", "23_a", "a23_4",
            "70_1", "0_1", "",
        ] {
            assert_eq!(n.resolve(name), None, "{name}");
        }
    }

    #[test]
    fn test_registry_groups_by_unit() {
        let n = naming();
        let mut registry = UnitRegistry::new();
        for (id, name) in [(1u64, "23_1"), (2, "23_2"), (3, "24_1"), (4, "Site_9"), (5, "23_3")] {
            if let Some(unit) = n.resolve(name) {
                registry.register(unit, id);
            }
        }
        assert_eq!(registry.primitives(23), &[1, 2, 5]);
        assert_eq!(registry.primitives(24), &[3]);
        assert_eq!(registry.unit_of(&4), None);
        assert_eq!(registry.units().collect::<Vec<_>>(), vec![23, 24]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_primitive_belongs_to_one_unit() {
        let mut registry = UnitRegistry::new();
        registry.register(3, "a");
        registry.register(3, "a");
        registry.register(4, "a");
        assert_eq!(registry.primitives(3), &[] as &[&str]);
        assert_eq!(registry.primitives(4), &["a"]);
        assert_eq!(registry.unit_of(&"a"), Some(4));
        registry.clear();
        assert!(registry.is_empty());
    }
}
