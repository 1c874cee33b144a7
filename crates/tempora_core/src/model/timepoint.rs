//! Timepoint and duration value objects.
//!
//! # Responsibility
//! - Represent a position in agent time as one coordinate per unit of a
//!   specific hierarchy revision.
//! - Represent relative offsets as raw, uninterpreted components.
//!
//! # Invariants
//! - `Timepoint` coordinates are canonical: every non-coarsest coordinate
//!   is below its unit's subdivision factor. Only the engine constructs
//!   timepoints, so the invariant cannot be broken from outside the crate.
//! - A timepoint is meaningful only against the hierarchy revision named by
//!   its binding; engine operations reject any other combination.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of one `Hierarchy` instance.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type HierarchyId = Uuid;

/// Snapshot token naming the hierarchy configuration a value was built
/// against: the instance identity plus its mutation revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyBinding {
    /// Identity of the hierarchy instance.
    pub hierarchy: HierarchyId,
    /// Revision counter at the time the value was produced.
    pub revision: u64,
}

impl HierarchyBinding {
    pub fn new(hierarchy: HierarchyId, revision: u64) -> Self {
        Self {
            hierarchy,
            revision,
        }
    }
}

/// One named coordinate of a timepoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitValue {
    /// Unit name, matching the bound hierarchy.
    pub unit: String,
    /// Non-negative coordinate. The coarsest coordinate is unbounded;
    /// every other one is below its unit's subdivision factor.
    pub value: u128,
}

/// A canonical position in agent time, bound to one hierarchy revision.
///
/// Timepoints are value objects: operations never mutate them, they return
/// new normalized instances. Two timepoints with the same binding are equal
/// exactly when they denote the same instant, because canonical form is
/// unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timepoint {
    binding: HierarchyBinding,
    coords: Vec<UnitValue>,
}

impl Timepoint {
    /// Assembles a timepoint from already-canonical coordinates.
    ///
    /// Crate-internal: only the engine may construct timepoints, after
    /// normalizing through the bound hierarchy's conversion table.
    pub(crate) fn from_canonical(binding: HierarchyBinding, coords: Vec<UnitValue>) -> Self {
        Self { binding, coords }
    }

    /// Returns the hierarchy binding this timepoint was produced against.
    pub fn binding(&self) -> HierarchyBinding {
        self.binding
    }

    /// Returns the coordinate for `unit`, or `None` if the bound hierarchy
    /// has no such unit.
    pub fn value(&self, unit: &str) -> Option<u128> {
        self.coords
            .iter()
            .find(|c| c.unit == unit)
            .map(|c| c.value)
    }

    /// Iterates coordinates coarsest to finest.
    pub fn components(&self) -> impl Iterator<Item = (&str, u128)> {
        self.coords.iter().map(|c| (c.unit.as_str(), c.value))
    }

    /// Returns whether every coordinate is zero.
    pub fn is_zero(&self) -> bool {
        self.coords.iter().all(|c| c.value == 0)
    }

    /// Reuses this timepoint as a relative offset.
    pub fn to_duration(&self) -> Duration {
        let mut duration = Duration::zero();
        for c in &self.coords {
            duration.set(&c.unit, c.value);
        }
        duration
    }
}

/// A relative offset expressed as raw `(unit, amount)` components.
///
/// Durations are pure data intake: unknown unit names and out-of-range
/// amounts are stored verbatim and only validated when an engine operation
/// interprets them against the active hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duration {
    components: BTreeMap<String, u128>,
}

impl Duration {
    /// Builds a duration from component pairs. A repeated unit name keeps
    /// the last amount given, mirroring assignment semantics.
    pub fn new(components: &[(&str, u128)]) -> Self {
        let mut duration = Self::zero();
        for (unit, amount) in components {
            duration.set(unit, *amount);
        }
        duration
    }

    /// The empty offset.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Sets the amount for one unit.
    pub fn set(&mut self, unit: &str, amount: u128) {
        self.components.insert(unit.to_string(), amount);
    }

    /// Iterates stored components in unit-name order.
    pub fn components(&self) -> impl Iterator<Item = (&str, u128)> {
        self.components.iter().map(|(unit, amount)| (unit.as_str(), *amount))
    }

    /// Returns whether no component carries a non-zero amount.
    pub fn is_zero(&self) -> bool {
        self.components.values().all(|amount| *amount == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::{Duration, HierarchyBinding, Timepoint, UnitValue};
    use uuid::Uuid;

    fn binding() -> HierarchyBinding {
        HierarchyBinding::new(Uuid::new_v4(), 0)
    }

    fn sample(binding: HierarchyBinding) -> Timepoint {
        Timepoint::from_canonical(
            binding,
            vec![
                UnitValue {
                    unit: "epoch".to_string(),
                    value: 1,
                },
                UnitValue {
                    unit: "cycle".to_string(),
                    value: 10,
                },
            ],
        )
    }

    #[test]
    fn value_lookup_by_unit_name() {
        let tp = sample(binding());
        assert_eq!(tp.value("epoch"), Some(1));
        assert_eq!(tp.value("cycle"), Some(10));
        assert_eq!(tp.value("parsec"), None);
    }

    #[test]
    fn equality_requires_matching_binding() {
        let b = binding();
        assert_eq!(sample(b), sample(b));
        assert_ne!(sample(b), sample(binding()));
    }

    #[test]
    fn to_duration_carries_every_coordinate() {
        let duration = sample(binding()).to_duration();
        let components: Vec<_> = duration.components().collect();
        assert_eq!(components, vec![("cycle", 10), ("epoch", 1)]);
    }

    #[test]
    fn duration_keeps_last_amount_for_repeated_unit() {
        let duration = Duration::new(&[("step", 5), ("step", 9)]);
        assert_eq!(duration.components().collect::<Vec<_>>(), vec![("step", 9)]);
    }

    #[test]
    fn zero_checks() {
        assert!(Duration::zero().is_zero());
        assert!(Duration::new(&[("step", 0)]).is_zero());
        assert!(!Duration::new(&[("step", 1)]).is_zero());
    }
}
