//! Schedule building.
//!
//! # Algorithm
//!
//! 1. Order tasks with Kahn's algorithm over the dependency graph,
//!    breaking ties by priority (descending) then task ID. A cycle or a
//!    reference to an unknown task aborts with a structural error.
//! 2. Place each task at the earliest instant allowed by the window,
//!    its dependencies, and its room — rooms run one task at a time.
//!    Dependency-free cleaning tasks are instead spread evenly across
//!    the window so sanitation coverage holds.
//! 3. Derive equipment utilization, risk factors and a confidence score.
//!
//! The builder places optimistically: it does not enforce labor
//! ceilings, equipment exclusivity or species policy. Those are the
//! conflict auditor's and policy auditor's job, and they apply equally
//! to hand-adjusted schedules.
//!
//! # Reference
//! Kahn (1962), "Topological sorting of large networks"

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::ids::{IdGenerator, ProposalId, TaskId};
use crate::models::{DateRange, ScheduledTask, ScheduleProposal, TaskType, WorkflowRequest, WorkflowTask};

/// Resource availability the builder schedules against.
#[derive(Debug, Clone)]
pub struct ResourceAvailability {
    /// Planning window.
    pub window: DateRange,
    /// Labor available per calendar day, in person-hours.
    pub labor_hours_per_day: f64,
    /// Available hours per equipment ID. Equipment not listed falls
    /// back to the full window span.
    pub equipment_hours: HashMap<String, f64>,
}

impl ResourceAvailability {
    /// Creates an availability context over the given window.
    pub fn new(window: DateRange, labor_hours_per_day: f64) -> Self {
        Self {
            window,
            labor_hours_per_day,
            equipment_hours: HashMap::new(),
        }
    }

    /// Declares available hours for one piece of equipment.
    pub fn with_equipment_hours(mut self, equipment_id: impl Into<String>, hours: f64) -> Self {
        self.equipment_hours.insert(equipment_id.into(), hours);
        self
    }

    /// Derives the context from a request: its window, its labor
    /// ceiling, and the full window span for each declared equipment ID.
    pub fn from_request(request: &WorkflowRequest) -> Self {
        let span = request.window.span_hours();
        let mut availability = Self::new(request.window, request.constraints.labor_hours_available);
        for equipment in &request.constraints.available_equipment {
            availability = availability.with_equipment_hours(equipment.as_str(), span);
        }
        availability
    }

    fn available_hours_for(&self, equipment_id: &str) -> f64 {
        self.equipment_hours
            .get(equipment_id)
            .copied()
            .unwrap_or_else(|| self.window.span_hours())
    }
}

/// Builds schedule proposals from workflow tasks.
pub struct ScheduleBuilder {
    ids: Arc<dyn IdGenerator>,
}

impl ScheduleBuilder {
    /// Creates a builder drawing proposal IDs from the given generator.
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self { ids }
    }

    /// Builds a proposal for the given tasks.
    ///
    /// Returns [`EngineError::DependencyCycle`] when the dependency
    /// graph cannot be ordered. The documented recovery is
    /// [`ScheduleProposal::empty`] plus a conflict check over the raw
    /// tasks, which reports the broken dependencies and blocks.
    pub fn build(
        &self,
        tasks: &[WorkflowTask],
        availability: &ResourceAvailability,
    ) -> EngineResult<ScheduleProposal> {
        let id = ProposalId::generate(&*self.ids);
        if tasks.is_empty() {
            return Ok(ScheduleProposal::empty(id, "No tasks to schedule"));
        }

        let order = topological_order(tasks)?;
        let depths = dependency_depths(tasks, &order);

        let window_start = availability.window.start;
        let mut room_free: HashMap<String, DateTime<Utc>> = HashMap::new();
        let mut end_of: HashMap<TaskId, DateTime<Utc>> = HashMap::new();
        let mut scheduled: Vec<ScheduledTask> = Vec::with_capacity(tasks.len());

        // Dependency-free cleaning tasks get evenly spread slots.
        let cleaning_total = tasks
            .iter()
            .filter(|t| t.task_type == TaskType::Cleaning && t.depends_on.is_empty())
            .count();
        let mut cleaning_seen = 0usize;

        for (sequence, &idx) in order.iter().enumerate() {
            let task = &tasks[idx];

            let mut start = window_start;
            if task.task_type == TaskType::Cleaning && task.depends_on.is_empty() {
                start = cleaning_slot(&availability.window, cleaning_seen, cleaning_total);
                cleaning_seen += 1;
            }
            for dep in &task.depends_on {
                if let Some(&dep_end) = end_of.get(dep) {
                    start = start.max(dep_end);
                }
            }
            if let Some(room) = &task.room {
                if let Some(&free_at) = room_free.get(room) {
                    start = start.max(free_at);
                }
            }

            let entry = ScheduledTask::place(task.clone(), start, sequence as u32);
            if let Some(room) = &task.room {
                room_free.insert(room.clone(), entry.end);
            }
            end_of.insert(task.id.clone(), entry.end);
            scheduled.push(entry);
        }

        scheduled.sort_by(|a, b| a.start.cmp(&b.start).then(a.sequence.cmp(&b.sequence)));

        let range = overall_range(&scheduled);
        let total_labor_hours: f64 = scheduled.iter().map(|s| s.assigned_labor_hours).sum();
        let equipment_utilization = utilization(&scheduled, availability);
        let risk_factors = risk_factors(
            &scheduled,
            availability,
            &equipment_utilization,
            total_labor_hours,
            &depths,
        );
        let confidence = confidence(
            &equipment_utilization,
            total_labor_hours,
            availability,
            &depths,
            risk_factors.len(),
        );

        let rationale = format!(
            "Scheduled {} task(s) over {} day(s): earliest start within the window \
             after dependencies and room availability; cleaning spread across the window",
            scheduled.len(),
            range.map(|r| r.days_spanned()).unwrap_or(0),
        );

        debug!(
            proposal_id = %id,
            task_count = scheduled.len(),
            confidence,
            "built schedule proposal"
        );

        Ok(ScheduleProposal {
            id,
            tasks: scheduled,
            range,
            total_labor_hours,
            equipment_utilization,
            rationale,
            confidence,
            risk_factors,
        })
    }
}

/// Kahn's algorithm with a deterministic ready order: highest priority
/// first, then smallest task ID. Cycles and unknown references leave
/// tasks unplaced and surface as [`EngineError::DependencyCycle`].
fn topological_order(tasks: &[WorkflowTask]) -> EngineResult<Vec<usize>> {
    let index_of: HashMap<&TaskId, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (&t.id, i))
        .collect();

    let mut in_degree = vec![0usize; tasks.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
    let mut broken: Vec<TaskId> = Vec::new();

    for (i, task) in tasks.iter().enumerate() {
        for dep in &task.depends_on {
            match index_of.get(dep) {
                Some(&d) => {
                    in_degree[i] += 1;
                    dependents[d].push(i);
                }
                None => broken.push(task.id.clone()),
            }
        }
    }
    if !broken.is_empty() {
        broken.sort();
        broken.dedup();
        return Err(EngineError::DependencyCycle { task_ids: broken });
    }

    let mut ready: Vec<usize> = (0..tasks.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(tasks.len());

    while !ready.is_empty() {
        // Linear scan keeps this simple; schedules are small.
        let best = ready
            .iter()
            .enumerate()
            .min_by(|(_, &a), (_, &b)| {
                tasks[b]
                    .priority
                    .cmp(&tasks[a].priority)
                    .then_with(|| tasks[a].id.cmp(&tasks[b].id))
            })
            .map(|(pos, _)| pos)
            .unwrap_or(0);
        let next = ready.swap_remove(best);
        order.push(next);
        for &dependent in &dependents[next] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(dependent);
            }
        }
    }

    if order.len() < tasks.len() {
        let mut stuck: Vec<TaskId> = (0..tasks.len())
            .filter(|i| !order.contains(i))
            .map(|i| tasks[i].id.clone())
            .collect();
        stuck.sort();
        return Err(EngineError::DependencyCycle { task_ids: stuck });
    }
    Ok(order)
}

/// Dependency depth per task index: 1 for roots, 1 + max over
/// dependencies otherwise. Computed along the topological order.
fn dependency_depths(tasks: &[WorkflowTask], order: &[usize]) -> Vec<usize> {
    let index_of: HashMap<&TaskId, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (&t.id, i))
        .collect();
    let mut depths = vec![1usize; tasks.len()];
    for &idx in order {
        let deepest_dep = tasks[idx]
            .depends_on
            .iter()
            .filter_map(|dep| index_of.get(dep).map(|&d| depths[d]))
            .max()
            .unwrap_or(0);
        depths[idx] = deepest_dep + 1;
    }
    depths
}

/// The slot for the `seen`-th of `total` spread cleaning tasks.
fn cleaning_slot(window: &DateRange, seen: usize, total: usize) -> DateTime<Utc> {
    if total == 0 {
        return window.start;
    }
    let span_minutes = (window.end - window.start).num_minutes();
    let offset = span_minutes * seen as i64 / total as i64;
    window.start + Duration::minutes(offset)
}

fn overall_range(scheduled: &[ScheduledTask]) -> Option<DateRange> {
    let start = scheduled.iter().map(|s| s.start).min()?;
    let end = scheduled.iter().map(|s| s.end).max()?;
    Some(DateRange::new(start, end))
}

/// Utilization percentage per equipment ID: booked hours over available
/// hours. Equipment is occupied for a task's whole duration.
fn utilization(
    scheduled: &[ScheduledTask],
    availability: &ResourceAvailability,
) -> HashMap<String, f64> {
    let mut booked: HashMap<String, f64> = HashMap::new();
    for entry in scheduled {
        let hours = entry.range().span_hours();
        for equipment in &entry.equipment_ids {
            *booked.entry(equipment.clone()).or_insert(0.0) += hours;
        }
    }
    for equipment in availability.equipment_hours.keys() {
        booked.entry(equipment.clone()).or_insert(0.0);
    }
    booked
        .into_iter()
        .map(|(equipment, hours)| {
            let available = availability.available_hours_for(&equipment);
            let percent = if available > 0.0 {
                hours / available * 100.0
            } else {
                100.0
            };
            (equipment, percent)
        })
        .collect()
}

/// Free-text weaknesses in stable order: hot equipment, labor beyond
/// the window's supply, undeclared equipment, deep dependency chains.
fn risk_factors(
    scheduled: &[ScheduledTask],
    availability: &ResourceAvailability,
    equipment_utilization: &HashMap<String, f64>,
    total_labor_hours: f64,
    depths: &[usize],
) -> Vec<String> {
    let mut risks = Vec::new();

    let mut hot: Vec<(&String, f64)> = equipment_utilization
        .iter()
        .filter(|(_, &pct)| pct > 90.0)
        .map(|(id, &pct)| (id, pct))
        .collect();
    hot.sort_by(|a, b| a.0.cmp(b.0));
    for (equipment, pct) in hot {
        risks.push(format!("Equipment {equipment} is at {pct:.0}% utilization"));
    }

    let supply = availability.labor_hours_per_day * availability.window.days_spanned() as f64;
    if total_labor_hours > supply {
        risks.push(format!(
            "Labor demand {total_labor_hours:.1}h exceeds the window's supply of {supply:.1}h"
        ));
    }

    if !availability.equipment_hours.is_empty() {
        let mut undeclared: Vec<String> = scheduled
            .iter()
            .flat_map(|entry| {
                entry
                    .equipment_ids
                    .iter()
                    .filter(|eq| !availability.equipment_hours.contains_key(*eq))
                    .map(|eq| format!("Task {} needs undeclared equipment {eq}", entry.task.id))
            })
            .collect();
        undeclared.sort();
        undeclared.dedup();
        risks.extend(undeclared);
    }

    let max_depth = depths.iter().copied().max().unwrap_or(1);
    if max_depth > 6 {
        risks.push(format!("Dependency chains run {max_depth} levels deep"));
    }

    risks
}

/// Deterministic confidence in [0, 100]: start at 100 and charge for
/// chain depth beyond three levels, equipment pressure above 75 %,
/// labor saturation above 100 %, and each named risk factor.
fn confidence(
    equipment_utilization: &HashMap<String, f64>,
    total_labor_hours: f64,
    availability: &ResourceAvailability,
    depths: &[usize],
    risk_count: usize,
) -> f64 {
    let mut score = 100.0;

    let max_depth = depths.iter().copied().max().unwrap_or(1) as f64;
    score -= 3.0 * (max_depth - 3.0).max(0.0);

    let peak_utilization = equipment_utilization
        .values()
        .copied()
        .fold(0.0_f64, f64::max);
    if peak_utilization > 75.0 {
        score -= (peak_utilization - 75.0) * 0.25;
    }

    let supply = availability.labor_hours_per_day * availability.window.days_spanned() as f64;
    if supply > 0.0 {
        let saturation = total_labor_hours / supply;
        if saturation > 1.0 {
            score -= 20.0 * (saturation - 1.0).min(1.0);
        }
    }

    score -= 5.0 * risk_count as f64;
    score.clamp(0.0, 100.0)
}
