//! Conflict auditing for schedule proposals.
//!
//! Runs a fixed set of independent detectors over a schedule and folds
//! their findings into one [`ConflictCheckResult`]: the conflicts, an
//! escalated allow/warn/block decision, deduplicated remediation advice
//! and a one-line rationale. A structural dependency pass runs before
//! the detectors so broken graphs block even when nothing was placed.
//!
//! # Usage
//!
//! ```
//! use mycoplan::conflict::{AuditThresholds, ConflictAuditor};
//!
//! let auditor = ConflictAuditor::new()
//!     .with_thresholds(AuditThresholds::default());
//!
//! assert_eq!(auditor.detector_names().len(), 7);
//! // let result = auditor.check_conflicts(&proposal.tasks, &tasks, &request);
//! ```

mod detectors;

pub use detectors::{
    ConflictDetector, ContaminationRisk, DetectionContext, EquipmentOverAllocation,
    HarvestClustering, LaborOverload, OverlappingTasks, SpeciesIncompatibility,
    SubstrateBottleneck,
};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ids::TaskId;
use crate::models::{
    ConflictCheckResult, ScheduledTask, SpeciesCatalog, WorkflowConflict, WorkflowRequest,
    WorkflowTask,
};

/// Tunable detection thresholds.
///
/// The defaults encode one crew's working limits: a 16-hour harvest
/// day, 25 % labor overtime before a warning and 50 % before a block,
/// two weeks between cleanings, and a day between substrate runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuditThresholds {
    /// Harvest labor one day can absorb before clustering, in hours.
    pub harvest_daily_labor_cap: f64,
    /// Daily labor demand over `available * ratio` warns.
    pub labor_warn_ratio: f64,
    /// Daily labor demand over `available * ratio` blocks.
    pub labor_critical_ratio: f64,
    /// Longest acceptable gap between cleaning starts, in days.
    pub cleaning_gap_days: i64,
    /// Minimum spacing between substrate preparation starts, in hours.
    pub substrate_spacing_hours: f64,
}

impl Default for AuditThresholds {
    fn default() -> Self {
        Self {
            harvest_daily_labor_cap: 16.0,
            labor_warn_ratio: 1.25,
            labor_critical_ratio: 1.5,
            cleaning_gap_days: 14,
            substrate_spacing_hours: 24.0,
        }
    }
}

/// Conflict auditor: the detector registry plus its tuning.
///
/// [`ConflictAuditor::new`] installs the seven built-in detectors;
/// [`ConflictAuditor::with_detector`] appends custom ones. Detection
/// order never changes the decision, only the report order.
#[derive(Debug, Clone)]
pub struct ConflictAuditor {
    detectors: Vec<Arc<dyn ConflictDetector>>,
    thresholds: AuditThresholds,
    species: SpeciesCatalog,
}

impl ConflictAuditor {
    /// Creates an auditor with the built-in detectors, default
    /// thresholds and the standard species catalog.
    pub fn new() -> Self {
        Self {
            detectors: vec![
                Arc::new(OverlappingTasks),
                Arc::new(SpeciesIncompatibility),
                Arc::new(SubstrateBottleneck),
                Arc::new(HarvestClustering),
                Arc::new(LaborOverload),
                Arc::new(EquipmentOverAllocation),
                Arc::new(ContaminationRisk),
            ],
            thresholds: AuditThresholds::default(),
            species: SpeciesCatalog::standard(),
        }
    }

    /// Replaces the detection thresholds.
    pub fn with_thresholds(mut self, thresholds: AuditThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Replaces the species catalog.
    pub fn with_catalog(mut self, species: SpeciesCatalog) -> Self {
        self.species = species;
        self
    }

    /// Appends a custom detector after the built-ins.
    pub fn with_detector(mut self, detector: impl ConflictDetector + 'static) -> Self {
        self.detectors.push(Arc::new(detector));
        self
    }

    /// Names of the installed detectors, in run order.
    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Checks a schedule for conflicts.
    ///
    /// `scheduled` is what the proposal placed; `tasks` is the requested
    /// workload, which may be larger when scheduling failed partway.
    /// The dependency pass compares the two, then every detector runs
    /// over the placed schedule.
    pub fn check_conflicts(
        &self,
        scheduled: &[ScheduledTask],
        tasks: &[WorkflowTask],
        request: &WorkflowRequest,
    ) -> ConflictCheckResult {
        let mut conflicts = dependency_conflicts(scheduled, tasks);
        let context = DetectionContext::new(scheduled, request, &self.thresholds, &self.species);
        for detector in &self.detectors {
            conflicts.extend(detector.detect(&context));
        }
        let result = ConflictCheckResult::from_conflicts(conflicts, Utc::now());
        debug!(
            decision = %result.decision,
            conflict_count = result.conflicts.len(),
            "conflict check complete"
        );
        result
    }
}

impl Default for ConflictAuditor {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural dependency pass. A scheduled task starting before a
/// dependency ends, or depending on a task the schedule never placed,
/// is always critical.
fn dependency_conflicts(
    scheduled: &[ScheduledTask],
    tasks: &[WorkflowTask],
) -> Vec<WorkflowConflict> {
    let placed: HashMap<&TaskId, &ScheduledTask> =
        scheduled.iter().map(|entry| (&entry.task.id, entry)).collect();

    let mut conflicts = Vec::new();
    for task in tasks {
        for dep in &task.depends_on {
            match (placed.get(&task.id), placed.get(dep)) {
                (Some(entry), Some(dep_entry)) => {
                    if entry.start < dep_entry.end {
                        conflicts.push(WorkflowConflict::dependency_violation(
                            format!("Task {} starts before its dependency {dep} ends", task.id),
                            vec![task.id.clone(), dep.clone()],
                        ));
                    }
                }
                (_, None) => {
                    conflicts.push(WorkflowConflict::dependency_violation(
                        format!(
                            "Task {} depends on {dep}, which is not in the schedule",
                            task.id
                        ),
                        vec![task.id.clone(), dep.clone()],
                    ));
                }
                (None, Some(_)) => {}
            }
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConflictType, ConstraintSet, DateRange, Decision, Severity, TaskType, NO_CONFLICTS_RATIONALE};
    use chrono::{DateTime, Duration, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn make_request() -> WorkflowRequest {
        let window = DateRange::new(at(1, 0), at(1, 0) + Duration::days(30));
        WorkflowRequest::new("req-1", window)
            .with_constraints(ConstraintSet::new(8.0).with_equipment("sterilizer"))
    }

    fn place(task: WorkflowTask, day: u32, hour: u32, sequence: u32) -> ScheduledTask {
        ScheduledTask::place(task, at(day, hour), sequence)
    }

    #[test]
    fn test_clean_schedule_allows() {
        let tasks = vec![
            WorkflowTask::new("prep", TaskType::SubstratePrep)
                .with_duration_hours(6.0)
                .with_labor_hours(4.0)
                .with_equipment("sterilizer"),
            WorkflowTask::new("harvest", TaskType::Harvest).with_labor_hours(6.0),
            WorkflowTask::new("c1", TaskType::Cleaning).with_labor_hours(2.0),
            WorkflowTask::new("c2", TaskType::Cleaning).with_labor_hours(2.0),
        ];
        let scheduled = vec![
            place(tasks[0].clone(), 1, 8, 0),
            place(tasks[1].clone(), 5, 6, 1),
            place(tasks[2].clone(), 2, 8, 2),
            place(tasks[3].clone(), 9, 8, 3),
        ];
        let result = ConflictAuditor::new().check_conflicts(&scheduled, &tasks, &make_request());

        assert_eq!(result.decision, Decision::Allow);
        assert!(result.conflicts.is_empty());
        assert_eq!(result.rationale, NO_CONFLICTS_RATIONALE);
    }

    #[test]
    fn test_dependency_order_violation_blocks() {
        let tasks = vec![
            WorkflowTask::new("a", TaskType::Inoculation).with_duration_hours(4.0),
            WorkflowTask::new("b", TaskType::Harvest)
                .with_dependency("a")
                .with_labor_hours(2.0),
            WorkflowTask::new("c", TaskType::Cleaning),
        ];
        let scheduled = vec![
            place(tasks[0].clone(), 1, 8, 0),
            // b starts one hour into a.
            place(tasks[1].clone(), 1, 9, 1),
            place(tasks[2].clone(), 1, 14, 2),
        ];
        let result = ConflictAuditor::new().check_conflicts(&scheduled, &tasks, &make_request());

        assert_eq!(result.decision, Decision::Block);
        assert!(result
            .conflicts
            .iter()
            .any(|c| c.conflict_type == ConflictType::DependencyViolation
                && c.severity == Severity::Critical));
    }

    #[test]
    fn test_unplaced_dependencies_block_an_empty_schedule() {
        // The recovery path after a dependency cycle: nothing was
        // placed, so the raw tasks are checked against an empty schedule.
        let tasks = vec![
            WorkflowTask::new("a", TaskType::Misting).with_dependency("b"),
            WorkflowTask::new("b", TaskType::Misting).with_dependency("a"),
        ];
        let result = ConflictAuditor::new().check_conflicts(&[], &tasks, &make_request());

        assert_eq!(result.decision, Decision::Block);
        assert_eq!(result.count_at(Severity::Critical), 2);
        assert!(result.rationale.contains("dependency-violation"));
    }

    #[test]
    fn test_detector_order_does_not_change_the_decision() {
        let tasks = vec![
            WorkflowTask::new("p1", TaskType::SubstratePrep)
                .with_room("prep-room")
                .with_duration_hours(6.0),
            WorkflowTask::new("p2", TaskType::SubstratePrep)
                .with_room("prep-room")
                .with_duration_hours(6.0),
        ];
        let scheduled = vec![
            place(tasks[0].clone(), 1, 8, 0),
            place(tasks[1].clone(), 1, 10, 1),
        ];
        let request = make_request();

        let forward = ConflictAuditor::new();
        let mut reversed = forward.clone();
        reversed.detectors.reverse();

        let a = forward.check_conflicts(&scheduled, &tasks, &request);
        let b = reversed.check_conflicts(&scheduled, &tasks, &request);

        assert_eq!(a.decision, b.decision);
        let mut tags_a: Vec<&str> = a.conflicts.iter().map(|c| c.conflict_type.tag()).collect();
        let mut tags_b: Vec<&str> = b.conflicts.iter().map(|c| c.conflict_type.tag()).collect();
        tags_a.sort();
        tags_b.sort();
        assert_eq!(tags_a, tags_b);
    }

    #[test]
    fn test_custom_detector_is_appended() {
        #[derive(Debug, Clone, Copy)]
        struct AlwaysInfo;

        impl ConflictDetector for AlwaysInfo {
            fn name(&self) -> &'static str {
                "always-info"
            }

            fn detect(&self, context: &DetectionContext<'_>) -> Vec<WorkflowConflict> {
                if context.scheduled.is_empty() {
                    return Vec::new();
                }
                vec![WorkflowConflict::contamination_risk(
                    Severity::Info,
                    "advisory only",
                    Vec::new(),
                )]
            }
        }

        let tasks = vec![WorkflowTask::new("c1", TaskType::Cleaning)];
        let scheduled = vec![place(tasks[0].clone(), 1, 8, 0)];
        let auditor = ConflictAuditor::new().with_detector(AlwaysInfo);

        assert_eq!(auditor.detector_names().len(), 8);
        let result = auditor.check_conflicts(&scheduled, &tasks, &make_request());

        // An info finding is reported but never escalates the decision.
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.decision, Decision::Allow);
    }

    #[test]
    fn test_combined_findings_escalate_to_the_worst() {
        let tasks = vec![
            WorkflowTask::new("p1", TaskType::SubstratePrep)
                .with_room("prep-room")
                .with_duration_hours(6.0)
                .with_labor_hours(4.0),
            WorkflowTask::new("p2", TaskType::SubstratePrep)
                .with_room("prep-room")
                .with_duration_hours(6.0)
                .with_labor_hours(4.0),
            WorkflowTask::new("c1", TaskType::Cleaning),
        ];
        let scheduled = vec![
            place(tasks[0].clone(), 1, 8, 0),
            place(tasks[1].clone(), 1, 10, 1),
            place(tasks[2].clone(), 2, 8, 2),
        ];
        let result = ConflictAuditor::new().check_conflicts(&scheduled, &tasks, &make_request());

        // Room overlap during substrate prep (critical) plus a
        // substrate bottleneck (warning): the decision is the max.
        assert_eq!(result.decision, Decision::Block);
        assert!(result.rationale.contains("overlapping-tasks"));
        assert!(result.rationale.contains("substrate-bottleneck"));
        assert!(result.recommendations.len() >= 2);
    }
}
