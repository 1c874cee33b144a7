//! Human-time label mapping.
//!
//! A small, fixed translation table between agent units and external
//! human-facing labels, supplied at engine construction. Not extensible at
//! runtime.

use serde::{Deserialize, Serialize};

/// Bidirectional (agent unit, external label) table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanTimeMap {
    pairs: Vec<HumanUnitPair>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct HumanUnitPair {
    agent_unit: String,
    label: String,
}

impl HumanTimeMap {
    /// Builds a table from `(agent unit, external label)` pairs.
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            pairs: pairs
                .iter()
                .map(|(agent_unit, label)| HumanUnitPair {
                    agent_unit: (*agent_unit).to_string(),
                    label: (*label).to_string(),
                })
                .collect(),
        }
    }

    /// External label for an agent unit, if mapped.
    pub fn label_for(&self, agent_unit: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|pair| pair.agent_unit == agent_unit)
            .map(|pair| pair.label.as_str())
    }

    /// Agent unit for an external label, if mapped.
    pub fn agent_unit_for(&self, label: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|pair| pair.label == label)
            .map(|pair| pair.agent_unit.as_str())
    }
}

impl Default for HumanTimeMap {
    /// The stock table for the default hierarchy. `microstep` is
    /// intentionally unmapped and drops out of human-time views.
    fn default() -> Self {
        Self::new(&[
            ("epoch", "hours"),
            ("cycle", "minutes"),
            ("step", "seconds"),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::HumanTimeMap;

    #[test]
    fn default_table_maps_both_directions() {
        let map = HumanTimeMap::default();
        assert_eq!(map.label_for("cycle"), Some("minutes"));
        assert_eq!(map.agent_unit_for("hours"), Some("epoch"));
        assert_eq!(map.label_for("microstep"), None);
        assert_eq!(map.agent_unit_for("fortnights"), None);
    }
}
