//! Timepoint arithmetic bound to one hierarchy.
//!
//! # Responsibility
//! - Normalize, convert, add, subtract, compare and diff timepoints against
//!   the owned hierarchy's conversion table.
//! - Translate agent time to and from human-facing labels.
//!
//! # Invariants
//! - Every operation goes through the absolute-value round trip: convert to
//!   base units, operate, decompose. There is no carry-propagation path, so
//!   arithmetic cannot diverge after a reconfiguration.
//! - A timepoint whose binding does not match the active hierarchy id and
//!   revision is rejected, never reinterpreted.

pub mod human;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::hierarchy::Hierarchy;
use crate::model::timepoint::{Duration, HierarchyBinding, Timepoint, UnitValue};

pub use human::HumanTimeMap;

pub type TemporalResult<T> = Result<T, TemporalError>;

/// Failure of a timepoint operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemporalError {
    /// A component named a unit the active hierarchy does not have.
    UnknownUnit(String),
    /// A human-time entry used a label with no mapping.
    UnknownLabel(String),
    /// Subtraction would drop below the zero timepoint.
    NegativeResult { minuend: u128, subtrahend: u128 },
    /// A signed absolute value below zero was supplied.
    NegativeAbsolute(i128),
    /// The timepoint was produced against another hierarchy configuration.
    StaleTimepoint {
        active: HierarchyBinding,
        found: HierarchyBinding,
    },
}

impl Display for TemporalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownUnit(name) => write!(f, "unknown unit `{name}` in components"),
            Self::UnknownLabel(label) => write!(f, "unknown human-time label `{label}`"),
            Self::NegativeResult {
                minuend,
                subtrahend,
            } => write!(
                f,
                "subtraction would produce a negative time: {subtrahend} base units from {minuend}"
            ),
            Self::NegativeAbsolute(value) => {
                write!(f, "absolute time cannot be negative, got {value}")
            }
            Self::StaleTimepoint { active, found } => write!(
                f,
                "timepoint bound to hierarchy {}@r{} cannot be used with {}@r{}",
                found.hierarchy, found.revision, active.hierarchy, active.revision
            ),
        }
    }
}

impl Error for TemporalError {}

/// The arithmetic seam shared by the plain engine and the adaptive wrapper.
///
/// The scheduler (and any other consumer) works against this trait so a
/// usage-tracking wrapper can slot in without changing call sites. Tracked
/// operations take `&mut self`; pure reads take `&self`.
pub trait TemporalSystem {
    /// The bound hierarchy.
    fn hierarchy(&self) -> &Hierarchy;

    /// The zero timepoint of the active configuration.
    fn zero(&self) -> Timepoint;

    /// Builds a normalized timepoint from partial components.
    fn create(&self, components: &[(&str, u128)]) -> TemporalResult<Timepoint>;

    /// Absolute value in base units.
    fn to_absolute(&self, tp: &Timepoint) -> TemporalResult<u128>;

    /// Canonical decomposition of an absolute base-unit value.
    fn from_absolute(&self, value: u128) -> Timepoint;

    /// Addition of a relative offset.
    fn add(&mut self, tp: &Timepoint, delta: &Duration) -> TemporalResult<Timepoint>;

    /// Subtraction of a relative offset; fails below zero.
    fn subtract(&mut self, tp: &Timepoint, delta: &Duration) -> TemporalResult<Timepoint>;

    /// Total order by absolute value.
    fn compare(&mut self, a: &Timepoint, b: &Timepoint) -> TemporalResult<Ordering>;

    /// Symmetric absolute difference.
    fn difference(&self, a: &Timepoint, b: &Timepoint) -> TemporalResult<Timepoint>;

    /// Human-label view of a timepoint; unmapped units are omitted.
    fn to_human(&mut self, tp: &Timepoint) -> TemporalResult<BTreeMap<String, u128>>;

    /// Timepoint from human-label entries.
    fn from_human(&mut self, entries: &[(&str, u128)]) -> TemporalResult<Timepoint>;
}

/// Timepoint arithmetic engine owning a `Hierarchy` and a human-time table.
#[derive(Debug, Clone)]
pub struct TemporalEngine {
    hierarchy: Hierarchy,
    human_map: HumanTimeMap,
}

impl TemporalEngine {
    /// Binds an engine to `hierarchy` with the stock human-time table.
    pub fn new(hierarchy: Hierarchy) -> Self {
        Self::with_human_map(hierarchy, HumanTimeMap::default())
    }

    /// Binds an engine to `hierarchy` with a caller-supplied human-time
    /// table.
    pub fn with_human_map(hierarchy: Hierarchy, human_map: HumanTimeMap) -> Self {
        Self {
            hierarchy,
            human_map,
        }
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Mutable hierarchy access for runtime restructuring.
    ///
    /// Any mutation bumps the revision; previously produced timepoints
    /// become stale and are rejected by subsequent operations.
    pub fn hierarchy_mut(&mut self) -> &mut Hierarchy {
        &mut self.hierarchy
    }

    pub fn human_map(&self) -> &HumanTimeMap {
        &self.human_map
    }

    /// The zero timepoint of the active configuration.
    pub fn zero(&self) -> Timepoint {
        self.from_absolute(0)
    }

    /// Builds a normalized timepoint from partial components.
    ///
    /// Unspecified units default to 0; a repeated unit keeps its last
    /// amount. Out-of-range amounts are allowed and normalize away.
    pub fn create(&self, components: &[(&str, u128)]) -> TemporalResult<Timepoint> {
        let mut raw = vec![0u128; self.hierarchy.len()];
        for (unit, amount) in components {
            let index = self
                .hierarchy
                .index_of(unit)
                .ok_or_else(|| TemporalError::UnknownUnit((*unit).to_string()))?;
            raw[index] = *amount;
        }

        let mut absolute: u128 = 0;
        for (index, amount) in raw.iter().enumerate() {
            absolute += amount * self.hierarchy.distance_to_base(index);
        }
        Ok(self.from_absolute(absolute))
    }

    /// Absolute value in base units: the sum over units of coordinate times
    /// distance-to-base.
    pub fn to_absolute(&self, tp: &Timepoint) -> TemporalResult<u128> {
        self.check_binding(tp)?;
        let mut absolute: u128 = 0;
        for (index, (_, value)) in tp.components().enumerate() {
            absolute += value * self.hierarchy.distance_to_base(index);
        }
        Ok(absolute)
    }

    /// Canonical decomposition of an absolute base-unit value, coarsest to
    /// finest: integer quotient by each unit's base distance, then carry
    /// the remainder down. The final remainder is the base coordinate.
    pub fn from_absolute(&self, value: u128) -> Timepoint {
        let mut coords = Vec::with_capacity(self.hierarchy.len());
        let mut remainder = value;
        for (index, unit) in self.hierarchy.units().iter().enumerate() {
            let value = if index == self.hierarchy.base_index() {
                remainder
            } else {
                let distance = self.hierarchy.distance_to_base(index);
                let quotient = remainder / distance;
                remainder -= quotient * distance;
                quotient
            };
            coords.push(UnitValue {
                unit: unit.name.clone(),
                value,
            });
        }
        Timepoint::from_canonical(self.hierarchy.binding(), coords)
    }

    /// Signed entry point for absolute values; negatives are rejected.
    pub fn from_absolute_signed(&self, value: i128) -> TemporalResult<Timepoint> {
        if value < 0 {
            return Err(TemporalError::NegativeAbsolute(value));
        }
        Ok(self.from_absolute(value as u128))
    }

    /// Adds a relative offset, returning a new normalized timepoint.
    pub fn add(&self, tp: &Timepoint, delta: &Duration) -> TemporalResult<Timepoint> {
        let base = self.to_absolute(tp)?;
        let offset = self.duration_absolute(delta)?;
        Ok(self.from_absolute(base + offset))
    }

    /// Subtracts a relative offset; fails if the result would be negative.
    pub fn subtract(&self, tp: &Timepoint, delta: &Duration) -> TemporalResult<Timepoint> {
        let base = self.to_absolute(tp)?;
        let offset = self.duration_absolute(delta)?;
        if offset > base {
            return Err(TemporalError::NegativeResult {
                minuend: base,
                subtrahend: offset,
            });
        }
        Ok(self.from_absolute(base - offset))
    }

    /// Strict total order by absolute value.
    pub fn compare(&self, a: &Timepoint, b: &Timepoint) -> TemporalResult<Ordering> {
        Ok(self.to_absolute(a)?.cmp(&self.to_absolute(b)?))
    }

    /// Symmetric absolute difference between two timepoints.
    pub fn difference(&self, a: &Timepoint, b: &Timepoint) -> TemporalResult<Timepoint> {
        let abs_a = self.to_absolute(a)?;
        let abs_b = self.to_absolute(b)?;
        Ok(self.from_absolute(abs_a.abs_diff(abs_b)))
    }

    /// Human-label view of a timepoint. Units with no mapping entry are
    /// omitted from the result.
    pub fn to_human(&self, tp: &Timepoint) -> TemporalResult<BTreeMap<String, u128>> {
        self.check_binding(tp)?;
        let mut human = BTreeMap::new();
        for (unit, value) in tp.components() {
            if let Some(label) = self.human_map.label_for(unit) {
                human.insert(label.to_string(), value);
            }
        }
        Ok(human)
    }

    /// Builds a normalized timepoint from human-label entries; an entry
    /// with no mapping fails.
    pub fn from_human(&self, entries: &[(&str, u128)]) -> TemporalResult<Timepoint> {
        let mut components = Vec::with_capacity(entries.len());
        for (label, value) in entries {
            let unit = self
                .human_map
                .agent_unit_for(label)
                .ok_or_else(|| TemporalError::UnknownLabel((*label).to_string()))?;
            components.push((unit, *value));
        }
        self.create(&components)
    }

    fn check_binding(&self, tp: &Timepoint) -> TemporalResult<()> {
        let active = self.hierarchy.binding();
        if tp.binding() != active {
            return Err(TemporalError::StaleTimepoint {
                active,
                found: tp.binding(),
            });
        }
        Ok(())
    }

    /// Absolute value of a raw duration against the active hierarchy.
    fn duration_absolute(&self, delta: &Duration) -> TemporalResult<u128> {
        let mut absolute: u128 = 0;
        for (unit, amount) in delta.components() {
            let index = self
                .hierarchy
                .index_of(unit)
                .ok_or_else(|| TemporalError::UnknownUnit(unit.to_string()))?;
            absolute += amount * self.hierarchy.distance_to_base(index);
        }
        Ok(absolute)
    }
}

impl Default for TemporalEngine {
    /// An engine over the default hierarchy and stock human-time table.
    fn default() -> Self {
        Self::new(Hierarchy::default())
    }
}

impl TemporalSystem for TemporalEngine {
    fn hierarchy(&self) -> &Hierarchy {
        self.hierarchy()
    }

    fn zero(&self) -> Timepoint {
        self.zero()
    }

    fn create(&self, components: &[(&str, u128)]) -> TemporalResult<Timepoint> {
        self.create(components)
    }

    fn to_absolute(&self, tp: &Timepoint) -> TemporalResult<u128> {
        self.to_absolute(tp)
    }

    fn from_absolute(&self, value: u128) -> Timepoint {
        self.from_absolute(value)
    }

    fn add(&mut self, tp: &Timepoint, delta: &Duration) -> TemporalResult<Timepoint> {
        TemporalEngine::add(self, tp, delta)
    }

    fn subtract(&mut self, tp: &Timepoint, delta: &Duration) -> TemporalResult<Timepoint> {
        TemporalEngine::subtract(self, tp, delta)
    }

    fn compare(&mut self, a: &Timepoint, b: &Timepoint) -> TemporalResult<Ordering> {
        TemporalEngine::compare(self, a, b)
    }

    fn difference(&self, a: &Timepoint, b: &Timepoint) -> TemporalResult<Timepoint> {
        self.difference(a, b)
    }

    fn to_human(&mut self, tp: &Timepoint) -> TemporalResult<BTreeMap<String, u128>> {
        TemporalEngine::to_human(self, tp)
    }

    fn from_human(&mut self, entries: &[(&str, u128)]) -> TemporalResult<Timepoint> {
        TemporalEngine::from_human(self, entries)
    }
}

#[cfg(test)]
mod tests {
    use super::{TemporalEngine, TemporalError};
    use crate::model::timepoint::Duration;

    #[test]
    fn decomposition_carries_remainders_down() {
        let engine = TemporalEngine::default();
        let tp = engine.from_absolute(3_630_500);
        assert_eq!(tp.value("epoch"), Some(2));
        assert_eq!(tp.value("cycle"), Some(12));
        assert_eq!(tp.value("step"), Some(30));
        assert_eq!(tp.value("microstep"), Some(500));
    }

    #[test]
    fn zero_is_the_identity_for_add() {
        let engine = TemporalEngine::default();
        let tp = engine.create(&[("cycle", 5)]).unwrap();
        let same = engine.add(&tp, &Duration::zero()).unwrap();
        assert_eq!(same, tp);
    }

    #[test]
    fn signed_entry_point_rejects_negatives() {
        let engine = TemporalEngine::default();
        let err = engine.from_absolute_signed(-1).unwrap_err();
        assert_eq!(err, TemporalError::NegativeAbsolute(-1));
        let ok = engine.from_absolute_signed(60_000).unwrap();
        assert_eq!(ok.value("cycle"), Some(1));
    }

    #[test]
    fn duration_with_unknown_unit_is_rejected_at_use() {
        let engine = TemporalEngine::default();
        let tp = engine.zero();
        let err = engine
            .add(&tp, &Duration::new(&[("parsec", 1)]))
            .unwrap_err();
        assert_eq!(err, TemporalError::UnknownUnit("parsec".to_string()));
    }
}
