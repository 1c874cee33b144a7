//! Dependency-aware multi-agent task scheduling.
//!
//! # Responsibility
//! - Register tasks and resolve their dependency graph into start/end
//!   times and agent assignments against the bound time system.
//! - Serve the timed export consumed by external rendering collaborators.
//!
//! # Invariants
//! - A pass is greedy and deterministic: ready tasks are visited in
//!   registration order and agent ties break to the lowest index. Both
//!   rules are observable contract, not implementation detail.
//! - Failure aborts the pass with no partial result; tasks committed by
//!   earlier iterations of the same pass keep their assignment, the rest
//!   stay untouched.

pub mod task;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::engine::{TemporalError, TemporalSystem};
use crate::hierarchy::ConfigError;
use crate::model::timepoint::{Duration, Timepoint};

pub use task::Task;

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Failure of a scheduling pass or of schedule introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Invalid configuration input, e.g. a zero agent count.
    Config(ConfigError),
    /// Timepoint arithmetic failed while computing an assignment.
    Time(TemporalError),
    /// No task is ready while unscheduled tasks remain: the dependency
    /// graph has a cycle or names a missing task.
    Unsatisfiable { remaining: Vec<String> },
    /// Derived schedule data was requested before a successful pass.
    NotScheduled { task_id: String },
}

impl Display for ScheduleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Time(err) => write!(f, "{err}"),
            Self::Unsatisfiable { remaining } => write!(
                f,
                "no ready task among {} unscheduled tasks: dependency cycle or missing dependency",
                remaining.len()
            ),
            Self::NotScheduled { task_id } => write!(
                f,
                "task `{task_id}` has no assignment; run a scheduling pass first"
            ),
        }
    }
}

impl Error for ScheduleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Time(err) => Some(err),
            Self::Unsatisfiable { .. } | Self::NotScheduled { .. } => None,
        }
    }
}

impl From<ConfigError> for ScheduleError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TemporalError> for ScheduleError {
    fn from(value: TemporalError) -> Self {
        Self::Time(value)
    }
}

/// Timed, agent-assigned view of one task, in absolute base units.
///
/// This is the read-only feed for plotting layers outside the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub id: String,
    pub start: u128,
    pub end: u128,
    pub duration: u128,
    pub agent: usize,
    pub dependencies: Vec<String>,
}

/// Greedy, non-backtracking multi-agent scheduler.
///
/// Owns its time system (a plain engine or the adaptive wrapper) plus the
/// registered task list. The caller owns task lifecycle: the core appends
/// and assigns, it never deletes.
pub struct Scheduler<T: TemporalSystem> {
    time: T,
    tasks: Vec<Task>,
}

impl<T: TemporalSystem> Scheduler<T> {
    pub fn new(time: T) -> Self {
        Self {
            time,
            tasks: Vec::new(),
        }
    }

    pub fn time(&self) -> &T {
        &self.time
    }

    pub fn time_mut(&mut self) -> &mut T {
        &mut self.time
    }

    /// Unwraps the scheduler back into its time system.
    pub fn into_time(self) -> T {
        self.time
    }

    /// Registers a task with no dependencies.
    ///
    /// Pure data intake: nothing is validated until a pass interprets the
    /// duration against the active hierarchy.
    pub fn add_task(&mut self, id: impl Into<String>, duration: Duration) {
        self.push_task(Task::new(id, duration));
    }

    /// Registers a task that becomes ready once every listed id is
    /// scheduled.
    pub fn add_dependent_task(
        &mut self,
        id: impl Into<String>,
        duration: Duration,
        dependencies: &[&str],
    ) {
        self.push_task(Task::new(id, duration).depends_on(dependencies));
    }

    /// Registers a fully assembled task (dependencies, resources).
    pub fn push_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Registered tasks in registration order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Clears every assignment so a fresh pass can run, e.g. after the
    /// hierarchy was reconfigured.
    pub fn clear_schedule(&mut self) {
        for task in &mut self.tasks {
            task.reset_assignment();
        }
    }

    /// Runs one scheduling pass over every registered task.
    ///
    /// Repeatedly collects the ready set (unscheduled tasks whose
    /// dependencies are all scheduled) in registration order and commits
    /// each ready task: start at the later of the latest dependency end and
    /// the earliest agent's availability, end at start plus duration, on
    /// the least-loaded agent (ties to the lowest index).
    ///
    /// Returns the committed tasks in commit order. Fails with
    /// `Unsatisfiable` when no task is ready while unscheduled tasks
    /// remain; no partial result is returned.
    pub fn schedule(&mut self, agent_count: usize) -> ScheduleResult<Vec<Task>> {
        if agent_count == 0 {
            return Err(ConfigError::InvalidAgentCount(agent_count).into());
        }

        let mut availability: Vec<Timepoint> = vec![self.time.zero(); agent_count];
        let mut ends_by_id: HashMap<String, Timepoint> = HashMap::new();
        let mut scheduled_ids: HashSet<String> = HashSet::new();
        let mut committed: Vec<usize> = Vec::new();
        let mut remaining: Vec<usize> = (0..self.tasks.len()).collect();

        while !remaining.is_empty() {
            let ready: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&index| {
                    self.tasks[index]
                        .dependencies
                        .iter()
                        .all(|dep| scheduled_ids.contains(dep))
                })
                .collect();

            if ready.is_empty() {
                let unresolved: Vec<String> = remaining
                    .iter()
                    .map(|&index| self.tasks[index].id.clone())
                    .collect();
                warn!(
                    "event=schedule_pass module=scheduler status=error reason=unsatisfiable remaining={}",
                    unresolved.len()
                );
                return Err(ScheduleError::Unsatisfiable {
                    remaining: unresolved,
                });
            }

            for &index in &ready {
                let duration = self.tasks[index].duration.clone();
                let dependencies: Vec<String> =
                    self.tasks[index].dependencies.iter().cloned().collect();

                // Latest dependency end, or the zero timepoint without
                // dependencies.
                let mut start = self.time.zero();
                for dep in &dependencies {
                    if let Some(end) = ends_by_id.get(dep) {
                        if self.time.compare(end, &start)? == Ordering::Greater {
                            start = end.clone();
                        }
                    }
                }

                // Least-loaded agent, ties to the lowest index.
                let mut agent = 0;
                for candidate in 1..agent_count {
                    if self.time.compare(&availability[candidate], &availability[agent])?
                        == Ordering::Less
                    {
                        agent = candidate;
                    }
                }
                if self.time.compare(&availability[agent], &start)? == Ordering::Greater {
                    start = availability[agent].clone();
                }

                let end = self.time.add(&start, &duration)?;

                let task = &mut self.tasks[index];
                task.start = Some(start);
                task.end = Some(end.clone());
                task.agent = Some(agent);
                debug!(
                    "event=task_scheduled module=scheduler status=ok id={} agent={agent}",
                    task.id
                );

                availability[agent] = end.clone();
                scheduled_ids.insert(task.id.clone());
                // A duplicated id keeps its first committed end time.
                ends_by_id.entry(task.id.clone()).or_insert(end);
                committed.push(index);
            }

            remaining.retain(|index| !ready.contains(index));
        }

        info!(
            "event=schedule_pass module=scheduler status=ok tasks={} agents={agent_count}",
            committed.len()
        );
        Ok(committed
            .iter()
            .map(|&index| self.tasks[index].clone())
            .collect())
    }

    /// Timed export for every registered task, in registration order.
    ///
    /// Fails with `NotScheduled` naming the first unassigned task when a
    /// pass has not successfully run.
    pub fn export(&self) -> ScheduleResult<Vec<ScheduleRecord>> {
        let mut records = Vec::with_capacity(self.tasks.len());
        for task in &self.tasks {
            let (start, end, agent) = match (&task.start, &task.end, task.agent) {
                (Some(start), Some(end), Some(agent)) => (start, end, agent),
                _ => {
                    return Err(ScheduleError::NotScheduled {
                        task_id: task.id.clone(),
                    })
                }
            };
            let start_abs = self.time.to_absolute(start)?;
            let end_abs = self.time.to_absolute(end)?;
            records.push(ScheduleRecord {
                id: task.id.clone(),
                start: start_abs,
                end: end_abs,
                duration: end_abs - start_abs,
                agent,
                dependencies: task.dependencies.iter().cloned().collect(),
            });
        }
        Ok(records)
    }
}
