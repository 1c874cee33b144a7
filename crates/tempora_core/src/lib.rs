//! Core domain logic for Tempora: a reconfigurable mixed-radix
//! representation of agent time plus a dependency-aware multi-agent task
//! scheduler built on top of it.
//!
//! Callers configure a [`hierarchy::Hierarchy`], bind a
//! [`engine::TemporalEngine`] to it, optionally wrap the engine in an
//! [`adaptive::AdaptiveEngine`], and hand either to a
//! [`scheduler::Scheduler`] for a timed, agent-assigned task list.

pub mod adaptive;
pub mod engine;
pub mod hierarchy;
pub mod logging;
pub mod model;
pub mod scheduler;

pub use adaptive::{AdaptiveEngine, FactorRange, OpKind, UsageTracker, DEFAULT_ADAPTATION_THRESHOLD};
pub use engine::{HumanTimeMap, TemporalEngine, TemporalError, TemporalResult, TemporalSystem};
pub use hierarchy::{ConfigError, ConfigResult, ConversionFactor, Hierarchy};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::timepoint::{Duration, HierarchyBinding, HierarchyId, Timepoint, UnitValue};
pub use model::unit::UnitSpec;
pub use scheduler::{ScheduleError, ScheduleRecord, ScheduleResult, Scheduler, Task};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
