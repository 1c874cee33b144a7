//! Mutable unit hierarchy and its conversion table.
//!
//! # Responsibility
//! - Hold the ordered unit sequence (coarsest first, finest last) and the
//!   derived multiplicative distances from every unit to the base unit.
//! - Apply runtime restructuring (insert/remove/resize) atomically.
//!
//! # Invariants
//! - Derived conversion state is computed from a candidate unit list and
//!   only swapped in when it validates; a failed mutation leaves the
//!   hierarchy exactly as it was, and a stale table is never observable.
//! - The revision counter is bumped on every successful mutation, so
//!   timepoints produced against an older configuration are detectable.
//! - The base unit is always the finest (last) entry and is never removed,
//!   resized, or subdivided.

use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

use log::info;
use uuid::Uuid;

use crate::model::timepoint::{HierarchyBinding, HierarchyId};
use crate::model::unit::UnitSpec;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Invalid hierarchy construction or mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    TooFewUnits { count: usize },
    InvalidFactor { unit: String, factor: u64 },
    DuplicateUnit(String),
    UnknownUnit(String),
    MissingBaseUnit,
    MisplacedBaseUnit(String),
    BaseUnitImmutable(String),
    FactorOverflow(String),
    InvalidAgentCount(usize),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewUnits { count } => {
                write!(f, "a hierarchy requires at least 2 units, got {count}")
            }
            Self::InvalidFactor { unit, factor } => write!(
                f,
                "unit `{unit}` has subdivision factor {factor}; non-base factors must be greater than 1"
            ),
            Self::DuplicateUnit(name) => write!(f, "duplicate unit name `{name}`"),
            Self::UnknownUnit(name) => write!(f, "unknown unit `{name}`"),
            Self::MissingBaseUnit => write!(
                f,
                "no base unit: the finest unit must omit its subdivision factor"
            ),
            Self::MisplacedBaseUnit(name) => write!(
                f,
                "unit `{name}` omits its subdivision factor but is not the finest unit"
            ),
            Self::BaseUnitImmutable(name) => write!(
                f,
                "unit `{name}` is the base unit and cannot be resized, removed, or subdivided"
            ),
            Self::FactorOverflow(name) => write!(
                f,
                "conversion distance for unit `{name}` exceeds the 128-bit range"
            ),
            Self::InvalidAgentCount(count) => {
                write!(f, "agent count must be at least 1, got {count}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Exact multiplicative factor between two units, as a reduced ratio.
///
/// Finer-to-coarser conversions are fractional, so the pairwise table is
/// served as ratios of base-unit distances rather than bare integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionFactor {
    pub numerator: u128,
    pub denominator: u128,
}

impl ConversionFactor {
    /// Lossy scalar view for read-only consumers such as plotting layers.
    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

/// Conversion data derived from a unit list: name lookup plus the distance
/// of every unit to the base unit.
#[derive(Debug, Clone)]
struct DerivedTable {
    to_base: Vec<u128>,
    index_by_name: HashMap<String, usize>,
}

/// Ordered, named sequence of temporal units with subdivision factors.
///
/// The derived `to_base` table (distance from each unit to the base unit)
/// is the single source of truth for every conversion in the crate; no
/// other component derives conversions independently.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    id: HierarchyId,
    revision: u64,
    units: Vec<UnitSpec>,
    base_index: usize,
    table: DerivedTable,
}

impl Hierarchy {
    /// Validates and builds a hierarchy from a coarsest-to-finest unit list.
    pub fn build(units: Vec<UnitSpec>) -> ConfigResult<Self> {
        let table = derive_table(&units)?;
        Ok(Self {
            id: Uuid::new_v4(),
            revision: 0,
            base_index: units.len() - 1,
            units,
            table,
        })
    }

    /// Returns this hierarchy's stable identity.
    pub fn id(&self) -> HierarchyId {
        self.id
    }

    /// Returns the current mutation revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the snapshot token for the current configuration.
    pub fn binding(&self) -> HierarchyBinding {
        HierarchyBinding::new(self.id, self.revision)
    }

    /// Ordered unit list, coarsest first.
    pub fn units(&self) -> &[UnitSpec] {
        &self.units
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Always false: a hierarchy holds at least two units.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// The finest unit.
    pub fn base_unit(&self) -> &UnitSpec {
        &self.units[self.base_index]
    }

    /// Index of the base unit (always the last position).
    pub fn base_index(&self) -> usize {
        self.base_index
    }

    /// Position of `name`, coarsest = 0.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.table.index_by_name.get(name).copied()
    }

    /// Returns whether `name` is a unit of this hierarchy.
    pub fn contains(&self, name: &str) -> bool {
        self.table.index_by_name.contains_key(name)
    }

    /// Distance from the unit at `index` to the base unit, in base units.
    pub(crate) fn distance_to_base(&self, index: usize) -> u128 {
        self.table.to_base[index]
    }

    /// Exact conversion factor from one unit to another, derived as the
    /// ratio of their base-unit distances.
    pub fn conversion(&self, from: &str, to: &str) -> ConfigResult<ConversionFactor> {
        let from_idx = self
            .index_of(from)
            .ok_or_else(|| ConfigError::UnknownUnit(from.to_string()))?;
        let to_idx = self
            .index_of(to)
            .ok_or_else(|| ConfigError::UnknownUnit(to.to_string()))?;

        let numerator = self.table.to_base[from_idx];
        let denominator = self.table.to_base[to_idx];
        let divisor = gcd(numerator, denominator);
        Ok(ConversionFactor {
            numerator: numerator / divisor,
            denominator: denominator / divisor,
        })
    }

    /// Inserts a new unit immediately finer than `anchor`.
    ///
    /// Fails if `name` already exists, `anchor` is unknown, `factor <= 1`,
    /// or `anchor` is the base unit (nothing may sit below the base).
    pub fn insert_unit_after(&mut self, name: &str, factor: u64, anchor: &str) -> ConfigResult<()> {
        let anchor_idx = self
            .index_of(anchor)
            .ok_or_else(|| ConfigError::UnknownUnit(anchor.to_string()))?;
        if anchor_idx == self.base_index {
            return Err(ConfigError::BaseUnitImmutable(anchor.to_string()));
        }
        self.insert_unit_at(name, factor, anchor_idx + 1)
    }

    /// Inserts a new unit immediately coarser than `anchor`.
    pub fn insert_unit_before(&mut self, name: &str, factor: u64, anchor: &str) -> ConfigResult<()> {
        let anchor_idx = self
            .index_of(anchor)
            .ok_or_else(|| ConfigError::UnknownUnit(anchor.to_string()))?;
        self.insert_unit_at(name, factor, anchor_idx)
    }

    fn insert_unit_at(&mut self, name: &str, factor: u64, position: usize) -> ConfigResult<()> {
        if self.contains(name) {
            return Err(ConfigError::DuplicateUnit(name.to_string()));
        }
        if factor <= 1 {
            return Err(ConfigError::InvalidFactor {
                unit: name.to_string(),
                factor,
            });
        }

        let mut candidate = self.units.clone();
        candidate.insert(position, UnitSpec::with_factor(name, factor));
        self.commit(candidate)?;
        info!(
            "event=unit_inserted module=hierarchy status=ok unit={name} factor={factor} position={position} revision={}",
            self.revision
        );
        Ok(())
    }

    /// Removes a non-base unit.
    ///
    /// Fails if `name` is unknown or the base unit, or if removal would
    /// leave fewer than two units.
    pub fn remove_unit(&mut self, name: &str) -> ConfigResult<()> {
        let index = self
            .index_of(name)
            .ok_or_else(|| ConfigError::UnknownUnit(name.to_string()))?;
        if index == self.base_index {
            return Err(ConfigError::BaseUnitImmutable(name.to_string()));
        }
        if self.units.len() - 1 < 2 {
            return Err(ConfigError::TooFewUnits {
                count: self.units.len() - 1,
            });
        }

        let mut candidate = self.units.clone();
        candidate.remove(index);
        self.commit(candidate)?;
        info!(
            "event=unit_removed module=hierarchy status=ok unit={name} revision={}",
            self.revision
        );
        Ok(())
    }

    /// Replaces a non-base unit's subdivision factor.
    ///
    /// Fails if `name` is unknown or the base unit, or if `new_factor <= 1`.
    pub fn adjust_factor(&mut self, name: &str, new_factor: u64) -> ConfigResult<()> {
        let index = self
            .index_of(name)
            .ok_or_else(|| ConfigError::UnknownUnit(name.to_string()))?;
        if index == self.base_index {
            return Err(ConfigError::BaseUnitImmutable(name.to_string()));
        }
        if new_factor <= 1 {
            return Err(ConfigError::InvalidFactor {
                unit: name.to_string(),
                factor: new_factor,
            });
        }

        let old_factor = self.units[index].subdivision_to_next.unwrap_or(0);
        let mut candidate = self.units.clone();
        candidate[index].subdivision_to_next = Some(new_factor);
        self.commit(candidate)?;
        info!(
            "event=factor_adjusted module=hierarchy status=ok unit={name} from={old_factor} to={new_factor} revision={}",
            self.revision
        );
        Ok(())
    }

    /// Swaps in a validated candidate unit list and bumps the revision.
    ///
    /// Derivation happens before any field is touched, so an error leaves
    /// the hierarchy unchanged.
    fn commit(&mut self, candidate: Vec<UnitSpec>) -> ConfigResult<()> {
        let table = derive_table(&candidate)?;
        self.base_index = candidate.len() - 1;
        self.units = candidate;
        self.table = table;
        self.revision += 1;
        Ok(())
    }
}

impl Default for Hierarchy {
    /// The default agent hierarchy: `epoch/24, cycle/60, step/1000,
    /// microstep`.
    fn default() -> Self {
        Self::build(vec![
            UnitSpec::with_factor("epoch", 24),
            UnitSpec::with_factor("cycle", 60),
            UnitSpec::with_factor("step", 1000),
            UnitSpec::base("microstep"),
        ])
        .expect("default unit table is valid")
    }
}

/// Validates a unit list and computes its conversion data.
fn derive_table(units: &[UnitSpec]) -> ConfigResult<DerivedTable> {
    if units.len() < 2 {
        return Err(ConfigError::TooFewUnits { count: units.len() });
    }

    let base_index = units.len() - 1;
    let mut index_by_name = HashMap::with_capacity(units.len());
    for (index, unit) in units.iter().enumerate() {
        if index_by_name.insert(unit.name.clone(), index).is_some() {
            return Err(ConfigError::DuplicateUnit(unit.name.clone()));
        }
        match unit.subdivision_to_next {
            None if index != base_index => {
                return Err(ConfigError::MisplacedBaseUnit(unit.name.clone()));
            }
            Some(_) if index == base_index => {
                return Err(ConfigError::MissingBaseUnit);
            }
            Some(factor) if factor <= 1 => {
                return Err(ConfigError::InvalidFactor {
                    unit: unit.name.clone(),
                    factor,
                });
            }
            _ => {}
        }
    }

    let mut to_base = vec![1u128; units.len()];
    let mut distance: u128 = 1;
    for index in (0..base_index).rev() {
        let factor = units[index].subdivision_to_next.unwrap_or(0);
        distance = distance
            .checked_mul(u128::from(factor))
            .ok_or_else(|| ConfigError::FactorOverflow(units[index].name.clone()))?;
        to_base[index] = distance;
    }

    Ok(DerivedTable {
        to_base,
        index_by_name,
    })
}

fn gcd(a: u128, b: u128) -> u128 {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let remainder = a % b;
        a = b;
        b = remainder;
    }
    a
}
