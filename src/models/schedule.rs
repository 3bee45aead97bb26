//! Schedule proposal model.
//!
//! [`ScheduledTask`] binds a [`WorkflowTask`] to a concrete execution
//! window; [`ScheduleProposal`] is the ordered collection handed to the
//! conflict auditor and the plan assembler.
//!
//! # Interval Semantics
//! All intervals are half-open `[start, end)`: a task ending at 10:00
//! does not overlap a task starting at 10:00. Calendar-day rules use the
//! UTC date of a timestamp.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ids::{ProposalId, TaskId};

use super::WorkflowTask;

/// A half-open date-time span `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a range. `end` is expected to be at or after `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Half-open interval overlap test.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Span in fractional hours.
    pub fn span_hours(&self) -> f64 {
        (self.end - self.start).num_minutes() as f64 / 60.0
    }

    /// Number of UTC calendar days touched, counting both endpoints.
    pub fn days_spanned(&self) -> i64 {
        (self.end.date_naive() - self.start.date_naive()).num_days() + 1
    }
}

/// A task bound to a concrete execution window.
///
/// Owns its [`WorkflowTask`] one-to-one: a task appears in at most one
/// scheduled entry per proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// The underlying work item.
    pub task: WorkflowTask,
    /// Execution window start.
    pub start: DateTime<Utc>,
    /// Execution window end (exclusive).
    pub end: DateTime<Utc>,
    /// Person-hours booked for the window.
    pub assigned_labor_hours: f64,
    /// Equipment booked for the window.
    pub equipment_ids: Vec<String>,
    /// Position in the proposal's execution order.
    pub sequence: u32,
}

impl ScheduledTask {
    /// Places a task at `start`, deriving the end from the task's
    /// estimated duration and booking its estimated labor and equipment.
    pub fn place(task: WorkflowTask, start: DateTime<Utc>, sequence: u32) -> Self {
        let end = start + Duration::minutes((task.duration_hours * 60.0).round() as i64);
        let assigned_labor_hours = task.labor_hours;
        let equipment_ids = task.equipment_ids.clone();
        Self {
            task,
            start,
            end,
            assigned_labor_hours,
            equipment_ids,
            sequence,
        }
    }

    /// Overrides the execution window (manual adjustments, tests).
    pub fn with_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Overrides the booked labor.
    pub fn with_assigned_labor(mut self, hours: f64) -> Self {
        self.assigned_labor_hours = hours;
        self
    }

    /// The execution window as a range.
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }

    /// Half-open overlap with another scheduled task.
    pub fn overlaps(&self, other: &ScheduledTask) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// UTC day the task starts on. Day-grouping rules (labor load,
    /// harvest clustering) attribute the whole task to this day.
    pub fn start_day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Whether the task is active at any point during the given UTC day.
    pub fn active_on(&self, day: NaiveDate) -> bool {
        let first = self.start.date_naive();
        // End is exclusive: a task ending exactly at midnight is not
        // active on the day that starts there.
        let last = if self.end > self.start {
            (self.end - Duration::seconds(1)).date_naive()
        } else {
            first
        };
        day >= first && day <= last
    }
}

/// A concrete schedule produced by the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleProposal {
    /// Unique proposal identifier.
    pub id: ProposalId,
    /// Scheduled tasks, ordered by start time then sequence.
    pub tasks: Vec<ScheduledTask>,
    /// Overall execution window. `None` when the proposal is empty.
    pub range: Option<DateRange>,
    /// Total booked person-hours.
    pub total_labor_hours: f64,
    /// Utilization percentage (0–100) per equipment ID.
    pub equipment_utilization: HashMap<String, f64>,
    /// Why the schedule looks the way it does.
    pub rationale: String,
    /// Confidence score in [0, 100].
    pub confidence: f64,
    /// Known weaknesses of this schedule, in stable order.
    pub risk_factors: Vec<String>,
}

impl ScheduleProposal {
    /// The zero-task proposal returned when scheduling fails
    /// structurally (for example, on a dependency cycle).
    pub fn empty(id: ProposalId, rationale: impl Into<String>) -> Self {
        Self {
            id,
            tasks: Vec::new(),
            range: None,
            total_labor_hours: 0.0,
            equipment_utilization: HashMap::new(),
            rationale: rationale.into(),
            confidence: 0.0,
            risk_factors: Vec::new(),
        }
    }

    /// Number of scheduled tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the proposal holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Looks up the scheduled entry for a task ID.
    pub fn scheduled_for(&self, task_id: &TaskId) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|s| &s.task.id == task_id)
    }
}
