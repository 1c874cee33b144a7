//! Operation-usage accounting for the adaptive layer.
//!
//! # Responsibility
//! - Count operations by kind and, when tagged, by unit name.
//! - Signal when the adaptation threshold is reached.
//!
//! # Invariants
//! - The threshold tick resets after every tuning pass; the per-kind and
//!   per-unit history persists for the lifetime of the tracker.

use std::collections::BTreeMap;

/// Kind of tracked arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OpKind {
    Add,
    Subtract,
    Compare,
    ToHuman,
    FromHuman,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Compare => "compare",
            Self::ToHuman => "to_human",
            Self::FromHuman => "from_human",
        }
    }
}

/// Instance-owned usage counters.
///
/// Explicit state with clear reset semantics: nothing here is ambient or
/// shared between wrapper instances.
#[derive(Debug, Clone)]
pub struct UsageTracker {
    op_counts: BTreeMap<OpKind, u64>,
    unit_counts: BTreeMap<String, u64>,
    tick: u64,
    threshold: u64,
}

impl UsageTracker {
    pub fn new(threshold: u64) -> Self {
        Self {
            op_counts: BTreeMap::new(),
            unit_counts: BTreeMap::new(),
            tick: 0,
            threshold,
        }
    }

    /// Records one operation. Returns `true` when the threshold tick is
    /// reached and a tuning pass is due.
    pub fn record(&mut self, op: OpKind, unit: Option<&str>) -> bool {
        *self.op_counts.entry(op).or_insert(0) += 1;
        if let Some(unit) = unit {
            *self.unit_counts.entry(unit.to_string()).or_insert(0) += 1;
        }
        self.tick += 1;
        self.tick >= self.threshold
    }

    /// Resets the threshold tick, keeping history.
    pub fn reset_tick(&mut self) {
        self.tick = 0;
    }

    /// Lifetime count for one operation kind.
    pub fn op_count(&self, op: OpKind) -> u64 {
        self.op_counts.get(&op).copied().unwrap_or(0)
    }

    /// Lifetime count of operations tagged with `unit`.
    pub fn unit_count(&self, unit: &str) -> u64 {
        self.unit_counts.get(unit).copied().unwrap_or(0)
    }

    /// Total of all unit-tagged operations.
    pub fn total_unit_tagged(&self) -> u64 {
        self.unit_counts.values().sum()
    }

    /// Ticks recorded since the last tuning pass.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: u64) {
        self.threshold = threshold;
    }
}
