//! Temporal unit descriptors.
//!
//! # Responsibility
//! - Describe one level of a unit hierarchy: a name plus the subdivision
//!   factor to the next finer level.
//!
//! # Invariants
//! - Exactly one unit per hierarchy (the finest) omits the factor; that
//!   unit is the base unit.
//! - Every non-base factor is greater than 1. Enforced by
//!   `Hierarchy::build` and every mutation, not here.

use serde::{Deserialize, Serialize};

/// One level of a temporal hierarchy.
///
/// `subdivision_to_next` answers "how many of the next finer unit make up
/// one of me". The base (finest) unit has nothing finer, so it carries
/// `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Unit name, unique within its hierarchy.
    pub name: String,
    /// Subdivision factor to the next finer unit; `None` marks the base unit.
    pub subdivision_to_next: Option<u64>,
}

impl UnitSpec {
    /// Creates a non-base unit with the given subdivision factor.
    pub fn with_factor(name: impl Into<String>, factor: u64) -> Self {
        Self {
            name: name.into(),
            subdivision_to_next: Some(factor),
        }
    }

    /// Creates the base (finest) unit.
    pub fn base(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subdivision_to_next: None,
        }
    }

    /// Returns whether this unit terminates the hierarchy.
    pub fn is_base(&self) -> bool {
        self.subdivision_to_next.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::UnitSpec;

    #[test]
    fn base_marker_is_derived_from_missing_factor() {
        assert!(UnitSpec::base("microstep").is_base());
        assert!(!UnitSpec::with_factor("cycle", 60).is_base());
    }

    #[test]
    fn with_factor_keeps_the_given_factor() {
        let unit = UnitSpec::with_factor("epoch", 24);
        assert_eq!(unit.name, "epoch");
        assert_eq!(unit.subdivision_to_next, Some(24));
    }
}
