//! Usage-driven adaptive reconfiguration.
//!
//! # Responsibility
//! - Wrap a `TemporalEngine` so arithmetic usage is recorded per operation.
//! - Re-tune subdivision factors toward per-position optimal ranges once
//!   enough operations accumulate.
//!
//! # Invariants
//! - Pure composition: the wrapper forwards to the engine it owns and never
//!   re-implements arithmetic.
//! - Every wrapped arithmetic call records usage exactly once, after
//!   delegating.
//! - Optimal ranges are recomputed whenever the unit count or the agent
//!   count changes.

pub mod usage;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use log::{debug, info};

use crate::engine::{TemporalEngine, TemporalResult, TemporalSystem};
use crate::hierarchy::{ConfigError, ConfigResult, Hierarchy};
use crate::model::timepoint::{Duration, Timepoint};

pub use usage::{OpKind, UsageTracker};

/// Operations between tuning passes unless overridden.
pub const DEFAULT_ADAPTATION_THRESHOLD: u64 = 100;

/// Inclusive factor bounds for one non-base unit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorRange {
    pub min: u64,
    pub max: u64,
}

impl FactorRange {
    fn clamp(&self, factor: u64) -> u64 {
        factor.clamp(self.min, self.max)
    }

    fn contains(&self, factor: u64) -> bool {
        (self.min..=self.max).contains(&factor)
    }
}

/// Adaptive wrapper around a `TemporalEngine`.
///
/// Holds the engine, the agent count, the derived optimal-range table and
/// an operation-usage tracker. Arithmetic goes through the engine
/// unchanged; only the bookkeeping and the occasional factor adjustment
/// live here.
#[derive(Debug, Clone)]
pub struct AdaptiveEngine {
    engine: TemporalEngine,
    agent_count: usize,
    ranges: Vec<FactorRange>,
    tracker: UsageTracker,
}

impl AdaptiveEngine {
    /// Wraps `engine` for a system of `agent_count` agents.
    pub fn new(engine: TemporalEngine, agent_count: usize) -> ConfigResult<Self> {
        if agent_count < 1 {
            return Err(ConfigError::InvalidAgentCount(agent_count));
        }
        let mut adaptive = Self {
            engine,
            agent_count,
            ranges: Vec::new(),
            tracker: UsageTracker::new(DEFAULT_ADAPTATION_THRESHOLD),
        };
        adaptive.recompute_ranges();
        Ok(adaptive)
    }

    pub fn engine(&self) -> &TemporalEngine {
        &self.engine
    }

    /// Unwraps back to the plain engine, dropping the usage history.
    pub fn into_engine(self) -> TemporalEngine {
        self.engine
    }

    pub fn agent_count(&self) -> usize {
        self.agent_count
    }

    /// Optimal factor ranges, one per non-base unit position.
    pub fn optimal_ranges(&self) -> &[FactorRange] {
        &self.ranges
    }

    pub fn tracker(&self) -> &UsageTracker {
        &self.tracker
    }

    /// Overrides how many tracked operations trigger a tuning pass.
    pub fn set_adaptation_threshold(&mut self, threshold: u64) {
        self.tracker.set_threshold(threshold);
    }

    /// Records one operation, tuning the hierarchy when the threshold is
    /// reached. Public so callers can attribute operations to units; the
    /// wrapped arithmetic records untagged.
    pub fn track_operation(&mut self, op: OpKind, unit: Option<&str>) {
        if self.tracker.record(op, unit) {
            self.retune();
            self.tracker.reset_tick();
        }
    }

    /// Updates the agent count, recomputes the optimal ranges, and clamps
    /// every out-of-range factor to the nearest bound.
    pub fn optimize_for_agent_count(&mut self, agent_count: usize) -> ConfigResult<()> {
        if agent_count < 1 {
            return Err(ConfigError::InvalidAgentCount(agent_count));
        }
        self.agent_count = agent_count;
        self.recompute_ranges();

        let targets: Vec<(String, u64)> = self
            .non_base_factors()
            .iter()
            .zip(&self.ranges)
            .filter(|((_, factor), range)| !range.contains(*factor))
            .map(|((name, factor), range)| (name.clone(), range.clamp(*factor).max(2)))
            .collect();
        for (name, target) in targets {
            self.engine.hierarchy_mut().adjust_factor(&name, target)?;
        }
        info!(
            "event=agent_count_optimized module=adaptive status=ok agent_count={agent_count}"
        );
        Ok(())
    }

    /// Inserts a unit through the hierarchy, then refreshes the range
    /// table (band boundaries shift with the unit count).
    pub fn insert_unit_after(&mut self, name: &str, factor: u64, anchor: &str) -> ConfigResult<()> {
        self.engine
            .hierarchy_mut()
            .insert_unit_after(name, factor, anchor)?;
        self.recompute_ranges();
        Ok(())
    }

    /// As `insert_unit_after`, anchored on the finer side.
    pub fn insert_unit_before(&mut self, name: &str, factor: u64, anchor: &str) -> ConfigResult<()> {
        self.engine
            .hierarchy_mut()
            .insert_unit_before(name, factor, anchor)?;
        self.recompute_ranges();
        Ok(())
    }

    /// Removes a unit through the hierarchy, then refreshes the range
    /// table.
    pub fn remove_unit(&mut self, name: &str) -> ConfigResult<()> {
        self.engine.hierarchy_mut().remove_unit(name)?;
        self.recompute_ranges();
        Ok(())
    }

    /// Resizes one unit through the hierarchy. The unit count is unchanged,
    /// so the range table stays as is.
    pub fn adjust_factor(&mut self, name: &str, new_factor: u64) -> ConfigResult<()> {
        self.engine.hierarchy_mut().adjust_factor(name, new_factor)
    }

    /// One tuning pass over every non-base unit.
    ///
    /// Usage share is the unit's tagged count over all tagged counts. Low
    /// usage (< 5%) is left alone; an out-of-range factor is clamped to the
    /// nearest bound; heavy usage (> 30%) grows the factor by half, light
    /// usage (< 10%) shrinks it by three tenths, both within the range.
    fn retune(&mut self) {
        let total = self.tracker.total_unit_tagged().max(1);

        let mut adjustments: Vec<(String, u64)> = Vec::new();
        for ((name, factor), range) in self.non_base_factors().iter().zip(&self.ranges) {
            let tagged = self.tracker.unit_count(name);
            if tagged * 20 < total {
                continue;
            }

            let target = if !range.contains(*factor) {
                range.clamp(*factor)
            } else if tagged * 10 > total * 3 {
                (factor * 3 / 2).min(range.max)
            } else if tagged * 10 < total {
                (factor * 7 / 10).max(range.min)
            } else {
                *factor
            };

            // adjust_factor rejects factors below 2, so tuning never aims there.
            let target = target.max(2);
            if target != *factor {
                adjustments.push((name.clone(), target));
            }
        }

        debug!(
            "event=usage_tuning module=adaptive status=ok adjustments={} tagged_total={total}",
            adjustments.len()
        );
        for (name, target) in adjustments {
            // The target passed every validation rule above.
            if let Err(err) = self.engine.hierarchy_mut().adjust_factor(&name, target) {
                debug!(
                    "event=usage_tuning module=adaptive status=error unit={name} error={err}"
                );
            }
        }
    }

    /// `(name, factor)` for every non-base unit, coarsest first.
    fn non_base_factors(&self) -> Vec<(String, u64)> {
        let hierarchy = self.engine.hierarchy();
        hierarchy.units()[..hierarchy.base_index()]
            .iter()
            .map(|unit| (unit.name.clone(), unit.subdivision_to_next.unwrap_or(0)))
            .collect()
    }

    /// Rebuilds the per-position range table. The ordered non-base units
    /// split into contiguous thirds: coarsest third `[A, 5A]`, middle
    /// `[5, 24]`, finest `[10, 100]` for `A` agents.
    fn recompute_ranges(&mut self) {
        let agents = self.agent_count as u64;
        let non_base = self.engine.hierarchy().base_index();
        self.ranges = (0..non_base)
            .map(|position| {
                if position * 3 < non_base {
                    FactorRange {
                        min: agents,
                        max: 5 * agents,
                    }
                } else if position * 3 < non_base * 2 {
                    FactorRange { min: 5, max: 24 }
                } else {
                    FactorRange { min: 10, max: 100 }
                }
            })
            .collect();
    }
}

impl TemporalSystem for AdaptiveEngine {
    fn hierarchy(&self) -> &Hierarchy {
        self.engine.hierarchy()
    }

    fn zero(&self) -> Timepoint {
        self.engine.zero()
    }

    fn create(&self, components: &[(&str, u128)]) -> TemporalResult<Timepoint> {
        self.engine.create(components)
    }

    fn to_absolute(&self, tp: &Timepoint) -> TemporalResult<u128> {
        self.engine.to_absolute(tp)
    }

    fn from_absolute(&self, value: u128) -> Timepoint {
        self.engine.from_absolute(value)
    }

    fn add(&mut self, tp: &Timepoint, delta: &Duration) -> TemporalResult<Timepoint> {
        let result = self.engine.add(tp, delta);
        self.track_operation(OpKind::Add, None);
        result
    }

    fn subtract(&mut self, tp: &Timepoint, delta: &Duration) -> TemporalResult<Timepoint> {
        let result = self.engine.subtract(tp, delta);
        self.track_operation(OpKind::Subtract, None);
        result
    }

    fn compare(&mut self, a: &Timepoint, b: &Timepoint) -> TemporalResult<Ordering> {
        let result = self.engine.compare(a, b);
        self.track_operation(OpKind::Compare, None);
        result
    }

    fn difference(&self, a: &Timepoint, b: &Timepoint) -> TemporalResult<Timepoint> {
        self.engine.difference(a, b)
    }

    fn to_human(&mut self, tp: &Timepoint) -> TemporalResult<BTreeMap<String, u128>> {
        let result = self.engine.to_human(tp);
        self.track_operation(OpKind::ToHuman, None);
        result
    }

    fn from_human(&mut self, entries: &[(&str, u128)]) -> TemporalResult<Timepoint> {
        let result = self.engine.from_human(entries);
        self.track_operation(OpKind::FromHuman, None);
        result
    }
}
