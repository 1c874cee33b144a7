//! Task records for the multi-agent scheduler.
//!
//! # Responsibility
//! - Carry registration data (id, duration, dependencies, resources) and
//!   the assignment produced by a scheduling pass.
//!
//! # Invariants
//! - Id uniqueness is the caller's responsibility; the core stores what it
//!   is given.
//! - `resources` is opaque pass-through and never influences scheduling.
//! - `start`/`end`/`agent` are set together by a successful pass and by
//!   nothing else.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::timepoint::{Duration, Timepoint};

/// One registered task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Caller-supplied identifier.
    pub id: String,
    /// Relative length, interpreted against the active hierarchy when the
    /// task is scheduled.
    pub duration: Duration,
    /// Ids that must be scheduled before this task becomes ready.
    pub dependencies: BTreeSet<String>,
    /// Opaque resource requirements, stored but never interpreted.
    pub resources: BTreeMap<String, serde_json::Value>,
    /// Assigned start, set by a scheduling pass.
    pub start: Option<Timepoint>,
    /// Assigned end, set by a scheduling pass.
    pub end: Option<Timepoint>,
    /// Assigned agent index, set by a scheduling pass.
    pub agent: Option<usize>,
}

impl Task {
    /// Creates an unscheduled task with no dependencies or resources.
    pub fn new(id: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: id.into(),
            duration,
            dependencies: BTreeSet::new(),
            resources: BTreeMap::new(),
            start: None,
            end: None,
            agent: None,
        }
    }

    /// Adds dependency ids, consuming and returning the task.
    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.dependencies.extend(ids.iter().map(|id| id.to_string()));
        self
    }

    /// Attaches one opaque resource requirement, consuming and returning
    /// the task.
    pub fn with_resource(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.resources.insert(key.into(), value);
        self
    }

    /// Returns whether a scheduling pass has assigned this task.
    pub fn is_scheduled(&self) -> bool {
        self.start.is_some() && self.end.is_some() && self.agent.is_some()
    }

    /// Clears any previous assignment.
    pub(crate) fn reset_assignment(&mut self) {
        self.start = None;
        self.end = None;
        self.agent = None;
    }
}
