//! Built-in conflict detectors.
//!
//! # Categories
//!
//! - **Spatial**: overlapping-tasks, equipment-over-allocation
//! - **Biological**: species-incompatibility, contamination-risk
//! - **Throughput**: substrate-bottleneck, harvest-clustering, labor-overload
//!
//! # Detection Convention
//! Detectors are independent: each reports every conflict it can see in
//! one deterministic pass and never consults another detector's output,
//! so the auditor may run them in any order. Day-grouping rules (labor,
//! harvest clustering) key on a task's UTC start date; species
//! incompatibility counts every day a transition is active.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;

use chrono::NaiveDate;

use super::AuditThresholds;
use crate::models::{
    ScheduledTask, Severity, SpeciesCatalog, TaskType, WorkflowConflict, WorkflowRequest,
};

/// Scheduling state passed to conflict detectors.
///
/// Built once per check: the room and start-day joins are shared by
/// every detector, and `BTreeMap` keys keep detection order stable.
pub struct DetectionContext<'a> {
    /// Tasks as placed by the proposal.
    pub scheduled: &'a [ScheduledTask],
    /// The request the schedule answers.
    pub request: &'a WorkflowRequest,
    /// Tunable detection thresholds.
    pub thresholds: &'a AuditThresholds,
    /// Species profiles and the incompatibility table.
    pub species: &'a SpeciesCatalog,
    by_room: BTreeMap<&'a str, Vec<&'a ScheduledTask>>,
    by_start_day: BTreeMap<NaiveDate, Vec<&'a ScheduledTask>>,
}

impl<'a> DetectionContext<'a> {
    /// Builds the context and its joins.
    pub fn new(
        scheduled: &'a [ScheduledTask],
        request: &'a WorkflowRequest,
        thresholds: &'a AuditThresholds,
        species: &'a SpeciesCatalog,
    ) -> Self {
        let mut by_room: BTreeMap<&str, Vec<&ScheduledTask>> = BTreeMap::new();
        let mut by_start_day: BTreeMap<NaiveDate, Vec<&ScheduledTask>> = BTreeMap::new();
        for entry in scheduled {
            if let Some(room) = entry.task.room.as_deref() {
                by_room.entry(room).or_default().push(entry);
            }
            by_start_day.entry(entry.start_day()).or_default().push(entry);
        }
        for group in by_room.values_mut() {
            group.sort_by_key(|entry| (entry.start, entry.sequence));
        }
        Self {
            scheduled,
            request,
            thresholds,
            species,
            by_room,
            by_start_day,
        }
    }

    fn of_type(&self, task_type: TaskType) -> Vec<&'a ScheduledTask> {
        let mut tasks: Vec<&ScheduledTask> = self
            .scheduled
            .iter()
            .filter(|entry| entry.task.task_type == task_type)
            .collect();
        tasks.sort_by_key(|entry| (entry.start, entry.sequence));
        tasks
    }
}

/// A detector that inspects one aspect of a schedule.
///
/// # Detection Convention
/// **Independent and order-free.** A detector sees only the context and
/// returns all conflicts of its kind; the auditor concatenates.
pub trait ConflictDetector: Send + Sync + Debug {
    /// Detector name, matching the conflict type tag it emits.
    fn name(&self) -> &'static str;

    /// Returns every conflict this detector finds in the schedule.
    fn detect(&self, context: &DetectionContext<'_>) -> Vec<WorkflowConflict>;

    /// Detector description.
    fn description(&self) -> &'static str {
        self.name()
    }
}

// ======================== Spatial detectors ========================

/// Two tasks booked into the same room at overlapping times.
///
/// Rooms run one task at a time. Overlap is checked on half-open
/// windows, so back-to-back tasks do not conflict. The finding is
/// critical when either task is a substrate preparation, since a shared
/// room during sterilization defeats the sterilization.
#[derive(Debug, Clone, Copy)]
pub struct OverlappingTasks;

impl ConflictDetector for OverlappingTasks {
    fn name(&self) -> &'static str {
        "overlapping-tasks"
    }

    fn detect(&self, context: &DetectionContext<'_>) -> Vec<WorkflowConflict> {
        let mut conflicts = Vec::new();
        for (room, group) in &context.by_room {
            for (i, a) in group.iter().enumerate() {
                for b in &group[i + 1..] {
                    if a.overlaps(b) {
                        let severity = if a.task.task_type == TaskType::SubstratePrep
                            || b.task.task_type == TaskType::SubstratePrep
                        {
                            Severity::Critical
                        } else {
                            Severity::Warning
                        };
                        conflicts.push(WorkflowConflict::overlapping_tasks(
                            severity, room, &a.task.id, &b.task.id,
                        ));
                    }
                }
            }
        }
        conflicts
    }

    fn description(&self) -> &'static str {
        "Tasks sharing a room at overlapping times"
    }
}

/// Two tasks booking one piece of equipment for overlapping windows.
///
/// Only equipment declared available on the request is tracked; a task
/// naming undeclared equipment is a proposal risk factor, not a
/// conflict. Equipment cannot be shared, so every overlap is critical.
#[derive(Debug, Clone, Copy)]
pub struct EquipmentOverAllocation;

impl ConflictDetector for EquipmentOverAllocation {
    fn name(&self) -> &'static str {
        "equipment-over-allocation"
    }

    fn detect(&self, context: &DetectionContext<'_>) -> Vec<WorkflowConflict> {
        let mut conflicts = Vec::new();
        for equipment in &context.request.constraints.available_equipment {
            let mut users: Vec<&ScheduledTask> = context
                .scheduled
                .iter()
                .filter(|entry| entry.equipment_ids.iter().any(|id| id == equipment))
                .collect();
            users.sort_by_key(|entry| (entry.start, entry.sequence));
            for (i, a) in users.iter().enumerate() {
                for b in &users[i + 1..] {
                    if a.overlaps(b) {
                        conflicts.push(WorkflowConflict::equipment_over_allocation(
                            equipment, &a.task.id, &b.task.id,
                        ));
                    }
                }
            }
        }
        conflicts
    }

    fn description(&self) -> &'static str {
        "Tasks double-booking declared equipment"
    }
}

// ======================== Biological detectors ========================

/// Incompatible species transitioning on the same calendar day.
///
/// Stage transitions (incubation, fruiting) open grow containers and
/// shed spores; two incompatible species doing that on the same day
/// cross-contaminate. A transition counts on every day it is active,
/// not just its start day, so multi-day transitions are caught. The
/// pair table lives in the species catalog.
#[derive(Debug, Clone, Copy)]
pub struct SpeciesIncompatibility;

impl ConflictDetector for SpeciesIncompatibility {
    fn name(&self) -> &'static str {
        "species-incompatibility"
    }

    fn detect(&self, context: &DetectionContext<'_>) -> Vec<WorkflowConflict> {
        let transitions: Vec<&ScheduledTask> = context
            .scheduled
            .iter()
            .filter(|entry| {
                matches!(
                    entry.task.task_type,
                    TaskType::IncubationTransition | TaskType::FruitingTransition
                ) && entry.task.species.is_some()
            })
            .collect();
        let first = transitions.iter().map(|t| t.start.date_naive()).min();
        let last = transitions.iter().map(|t| t.end.date_naive()).max();
        let (Some(first), Some(last)) = (first, last) else {
            return Vec::new();
        };

        let mut conflicts = Vec::new();
        // Each pair is reported once, on the first day both are active.
        let mut reported: HashSet<(usize, usize)> = HashSet::new();
        for day in first.iter_days() {
            if day > last {
                break;
            }
            let active: Vec<usize> = (0..transitions.len())
                .filter(|&i| transitions[i].active_on(day))
                .collect();
            for (pos, &i) in active.iter().enumerate() {
                for &j in &active[pos + 1..] {
                    let (a, b) = (transitions[i], transitions[j]);
                    if let (Some(species_a), Some(species_b)) =
                        (a.task.species.as_deref(), b.task.species.as_deref())
                    {
                        if species_a != species_b
                            && context.species.incompatible(species_a, species_b)
                            && reported.insert((i, j))
                        {
                            conflicts.push(WorkflowConflict::species_incompatibility(
                                day, species_a, species_b, &a.task.id, &b.task.id,
                            ));
                        }
                    }
                }
            }
        }
        conflicts
    }

    fn description(&self) -> &'static str {
        "Incompatible species transitioning on the same day"
    }
}

/// Missing or too-sparse cleaning coverage.
///
/// A schedule with work but no cleaning at all is critical. Otherwise,
/// each gap between consecutive cleaning starts longer than the
/// threshold is a warning.
#[derive(Debug, Clone, Copy)]
pub struct ContaminationRisk;

impl ConflictDetector for ContaminationRisk {
    fn name(&self) -> &'static str {
        "contamination-risk"
    }

    fn detect(&self, context: &DetectionContext<'_>) -> Vec<WorkflowConflict> {
        let cleanings = context.of_type(TaskType::Cleaning);
        if cleanings.is_empty() {
            if context.scheduled.is_empty() {
                return Vec::new();
            }
            return vec![WorkflowConflict::contamination_risk(
                Severity::Critical,
                format!(
                    "No cleaning tasks among {} scheduled task(s); contamination pressure only accumulates",
                    context.scheduled.len()
                ),
                Vec::new(),
            )];
        }

        let mut conflicts = Vec::new();
        for pair in cleanings.windows(2) {
            let gap_days = (pair[1].start_day() - pair[0].start_day()).num_days();
            if gap_days > context.thresholds.cleaning_gap_days {
                conflicts.push(WorkflowConflict::contamination_risk(
                    Severity::Warning,
                    format!(
                        "{gap_days} day(s) between cleanings {} and {}",
                        pair[0].task.id, pair[1].task.id
                    ),
                    vec![pair[0].task.id.clone(), pair[1].task.id.clone()],
                ));
            }
        }
        conflicts
    }

    fn description(&self) -> &'static str {
        "Cleaning coverage missing or too sparse"
    }
}

// ======================== Throughput detectors ========================

/// Substrate preparation runs spaced closer than the throughput floor.
///
/// Sterilizer turnaround, cooling and loading put a floor under how
/// often preparation can realistically start; consecutive starts packed
/// tighter than the threshold will slip.
#[derive(Debug, Clone, Copy)]
pub struct SubstrateBottleneck;

impl ConflictDetector for SubstrateBottleneck {
    fn name(&self) -> &'static str {
        "substrate-bottleneck"
    }

    fn detect(&self, context: &DetectionContext<'_>) -> Vec<WorkflowConflict> {
        let preps = context.of_type(TaskType::SubstratePrep);
        let mut conflicts = Vec::new();
        for pair in preps.windows(2) {
            let gap_hours = (pair[1].start - pair[0].start).num_minutes() as f64 / 60.0;
            if gap_hours < context.thresholds.substrate_spacing_hours {
                conflicts.push(WorkflowConflict::substrate_bottleneck(
                    gap_hours,
                    &pair[0].task.id,
                    &pair[1].task.id,
                ));
            }
        }
        conflicts
    }

    fn description(&self) -> &'static str {
        "Substrate preparations packed too tightly"
    }
}

/// A single day carrying more harvest labor than one crew handles.
///
/// Mushrooms are picked at peak or lost; harvests cannot slip the way
/// maintenance can. Days whose harvest labor exceeds the cap need a
/// second crew or a re-spread schedule.
#[derive(Debug, Clone, Copy)]
pub struct HarvestClustering;

impl ConflictDetector for HarvestClustering {
    fn name(&self) -> &'static str {
        "harvest-clustering"
    }

    fn detect(&self, context: &DetectionContext<'_>) -> Vec<WorkflowConflict> {
        let mut conflicts = Vec::new();
        for (day, group) in &context.by_start_day {
            let harvests: Vec<&ScheduledTask> = group
                .iter()
                .filter(|entry| entry.task.task_type == TaskType::Harvest)
                .copied()
                .collect();
            let total_hours: f64 = harvests.iter().map(|h| h.assigned_labor_hours).sum();
            if total_hours > context.thresholds.harvest_daily_labor_cap {
                conflicts.push(WorkflowConflict::harvest_clustering(
                    *day,
                    total_hours,
                    context.thresholds.harvest_daily_labor_cap,
                    harvests.iter().map(|h| h.task.id.clone()).collect(),
                ));
            }
        }
        conflicts
    }

    fn description(&self) -> &'static str {
        "Harvest labor piling up on one day"
    }
}

/// Daily labor demand exceeding the request's availability ceiling.
///
/// Demand is attributed to a task's start day. Exceeding the ceiling by
/// the warning ratio is overtime; exceeding it by the critical ratio is
/// a plan that cannot be staffed.
#[derive(Debug, Clone, Copy)]
pub struct LaborOverload;

impl ConflictDetector for LaborOverload {
    fn name(&self) -> &'static str {
        "labor-overload"
    }

    fn detect(&self, context: &DetectionContext<'_>) -> Vec<WorkflowConflict> {
        let available = context.request.constraints.labor_hours_available;
        let mut conflicts = Vec::new();
        for (day, group) in &context.by_start_day {
            let demand: f64 = group.iter().map(|entry| entry.assigned_labor_hours).sum();
            let severity = if demand > available * context.thresholds.labor_critical_ratio {
                Severity::Critical
            } else if demand > available * context.thresholds.labor_warn_ratio {
                Severity::Warning
            } else {
                continue;
            };
            conflicts.push(WorkflowConflict::labor_overload(
                severity,
                *day,
                demand,
                available,
                group.iter().map(|entry| entry.task.id.clone()).collect(),
            ));
        }
        conflicts
    }

    fn description(&self) -> &'static str {
        "Daily labor demand beyond the availability ceiling"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConflictType, ConstraintSet, DateRange, WorkflowTask};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn placed(task: WorkflowTask, day: u32, hour: u32, sequence: u32) -> ScheduledTask {
        ScheduledTask::place(task, at(day, hour), sequence)
    }

    fn make_request(labor_hours: f64) -> WorkflowRequest {
        let window = DateRange::new(at(1, 0), at(1, 0) + Duration::days(30));
        WorkflowRequest::new("req-1", window).with_constraints(
            ConstraintSet::new(labor_hours)
                .with_equipment("sterilizer")
                .with_equipment("flow-hood"),
        )
    }

    fn detect_with(
        detector: &dyn ConflictDetector,
        scheduled: &[ScheduledTask],
        request: &WorkflowRequest,
    ) -> Vec<WorkflowConflict> {
        let thresholds = AuditThresholds::default();
        let species = SpeciesCatalog::standard();
        let context = DetectionContext::new(scheduled, request, &thresholds, &species);
        detector.detect(&context)
    }

    #[test]
    fn test_overlap_same_room_is_detected() {
        let scheduled = [
            placed(
                WorkflowTask::new("a", TaskType::Misting)
                    .with_room("room-1")
                    .with_duration_hours(4.0),
                1,
                8,
                0,
            ),
            placed(
                WorkflowTask::new("b", TaskType::Monitoring)
                    .with_room("room-1")
                    .with_duration_hours(2.0),
                1,
                10,
                1,
            ),
        ];
        let request = make_request(8.0);
        let conflicts = detect_with(&OverlappingTasks, &scheduled, &request);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::OverlappingTasks);
        assert_eq!(conflicts[0].severity, Severity::Warning);
    }

    #[test]
    fn test_overlap_with_substrate_prep_is_critical() {
        let scheduled = [
            placed(
                WorkflowTask::new("prep", TaskType::SubstratePrep)
                    .with_room("prep-room")
                    .with_duration_hours(6.0),
                1,
                8,
                0,
            ),
            placed(
                WorkflowTask::new("maint", TaskType::EquipmentMaintenance)
                    .with_room("prep-room")
                    .with_duration_hours(2.0),
                1,
                9,
                1,
            ),
        ];
        let request = make_request(8.0);
        let conflicts = detect_with(&OverlappingTasks, &scheduled, &request);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Critical);
    }

    #[test]
    fn test_back_to_back_tasks_do_not_overlap() {
        let scheduled = [
            placed(
                WorkflowTask::new("a", TaskType::Misting)
                    .with_room("room-1")
                    .with_duration_hours(2.0),
                1,
                8,
                0,
            ),
            placed(
                WorkflowTask::new("b", TaskType::Misting)
                    .with_room("room-1")
                    .with_duration_hours(2.0),
                1,
                10,
                1,
            ),
        ];
        let request = make_request(8.0);
        assert!(detect_with(&OverlappingTasks, &scheduled, &request).is_empty());
    }

    #[test]
    fn test_different_rooms_do_not_conflict() {
        let scheduled = [
            placed(
                WorkflowTask::new("a", TaskType::Misting)
                    .with_room("room-1")
                    .with_duration_hours(4.0),
                1,
                8,
                0,
            ),
            placed(
                WorkflowTask::new("b", TaskType::Misting)
                    .with_room("room-2")
                    .with_duration_hours(4.0),
                1,
                8,
                1,
            ),
        ];
        let request = make_request(8.0);
        assert!(detect_with(&OverlappingTasks, &scheduled, &request).is_empty());
    }

    #[test]
    fn test_incompatible_species_same_day() {
        let scheduled = [
            placed(
                WorkflowTask::new("oy", TaskType::FruitingTransition).with_species("oyster"),
                5,
                8,
                0,
            ),
            placed(
                WorkflowTask::new("lm", TaskType::FruitingTransition).with_species("lions-mane"),
                5,
                14,
                1,
            ),
        ];
        let request = make_request(8.0);
        let conflicts = detect_with(&SpeciesIncompatibility, &scheduled, &request);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(
            conflicts[0].conflict_type,
            ConflictType::SpeciesIncompatibility
        );
        assert_eq!(conflicts[0].severity, Severity::Warning);
    }

    #[test]
    fn test_multi_day_transition_counts_on_every_active_day() {
        // The oyster incubation starts day 4 and runs 30h, so it is
        // still active on day 5 when the lions-mane transition happens
        // in another room.
        let scheduled = [
            placed(
                WorkflowTask::new("oy", TaskType::IncubationTransition)
                    .with_species("oyster")
                    .with_room("room-1")
                    .with_duration_hours(30.0),
                4,
                12,
                0,
            ),
            placed(
                WorkflowTask::new("lm", TaskType::FruitingTransition)
                    .with_species("lions-mane")
                    .with_room("room-2"),
                5,
                8,
                1,
            ),
        ];
        let request = make_request(8.0);
        let conflicts = detect_with(&SpeciesIncompatibility, &scheduled, &request);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(
            conflicts[0].conflict_type,
            ConflictType::SpeciesIncompatibility
        );
    }

    #[test]
    fn test_pair_active_on_several_days_reports_once() {
        let scheduled = [
            placed(
                WorkflowTask::new("oy", TaskType::IncubationTransition)
                    .with_species("oyster")
                    .with_duration_hours(72.0),
                4,
                8,
                0,
            ),
            placed(
                WorkflowTask::new("lm", TaskType::IncubationTransition)
                    .with_species("lions-mane")
                    .with_duration_hours(72.0),
                5,
                8,
                1,
            ),
        ];
        let request = make_request(8.0);
        let conflicts = detect_with(&SpeciesIncompatibility, &scheduled, &request);
        assert_eq!(conflicts.len(), 1);
        // Reported on the first shared active day.
        assert!(conflicts[0].description.contains("2026-03-05"));
    }

    #[test]
    fn test_incompatible_species_on_different_days_pass() {
        let scheduled = [
            placed(
                WorkflowTask::new("oy", TaskType::FruitingTransition).with_species("oyster"),
                5,
                8,
                0,
            ),
            placed(
                WorkflowTask::new("lm", TaskType::FruitingTransition).with_species("lions-mane"),
                6,
                8,
                1,
            ),
        ];
        let request = make_request(8.0);
        assert!(detect_with(&SpeciesIncompatibility, &scheduled, &request).is_empty());
    }

    #[test]
    fn test_compatible_species_same_day_pass() {
        let scheduled = [
            placed(
                WorkflowTask::new("oy", TaskType::FruitingTransition).with_species("oyster"),
                5,
                8,
                0,
            ),
            placed(
                WorkflowTask::new("ko", TaskType::FruitingTransition).with_species("king-oyster"),
                5,
                10,
                1,
            ),
        ];
        let request = make_request(8.0);
        assert!(detect_with(&SpeciesIncompatibility, &scheduled, &request).is_empty());
    }

    #[test]
    fn test_substrate_preps_packed_tight() {
        let scheduled = [
            placed(
                WorkflowTask::new("p1", TaskType::SubstratePrep).with_duration_hours(6.0),
                1,
                8,
                0,
            ),
            placed(
                WorkflowTask::new("p2", TaskType::SubstratePrep).with_duration_hours(6.0),
                1,
                14,
                1,
            ),
        ];
        let request = make_request(8.0);
        let conflicts = detect_with(&SubstrateBottleneck, &scheduled, &request);
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].description.contains("6.0h apart"));
    }

    #[test]
    fn test_substrate_preps_a_day_apart_pass() {
        let scheduled = [
            placed(
                WorkflowTask::new("p1", TaskType::SubstratePrep).with_duration_hours(6.0),
                1,
                8,
                0,
            ),
            placed(
                WorkflowTask::new("p2", TaskType::SubstratePrep).with_duration_hours(6.0),
                2,
                14,
                1,
            ),
        ];
        let request = make_request(8.0);
        assert!(detect_with(&SubstrateBottleneck, &scheduled, &request).is_empty());
    }

    #[test]
    fn test_harvest_clustering_over_the_cap() {
        let scheduled = [
            placed(
                WorkflowTask::new("h1", TaskType::Harvest).with_labor_hours(6.0),
                10,
                6,
                0,
            ),
            placed(
                WorkflowTask::new("h2", TaskType::Harvest).with_labor_hours(6.0),
                10,
                9,
                1,
            ),
            placed(
                WorkflowTask::new("h3", TaskType::Harvest).with_labor_hours(6.0),
                10,
                12,
                2,
            ),
        ];
        let request = make_request(24.0);
        let conflicts = detect_with(&HarvestClustering, &scheduled, &request);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].task_ids.len(), 3);
        assert!(conflicts[0].description.contains("18.0h"));
    }

    #[test]
    fn test_harvests_under_the_cap_pass() {
        let scheduled = [
            placed(
                WorkflowTask::new("h1", TaskType::Harvest).with_labor_hours(6.0),
                10,
                6,
                0,
            ),
            placed(
                WorkflowTask::new("h2", TaskType::Harvest).with_labor_hours(6.0),
                11,
                6,
                1,
            ),
        ];
        let request = make_request(24.0);
        assert!(detect_with(&HarvestClustering, &scheduled, &request).is_empty());
    }

    #[test]
    fn test_labor_overload_ratios() {
        // 8h available: 9h demand is within the 1.25x grace,
        // 11h warns, 13h blocks.
        let request = make_request(8.0);
        let mild = [placed(
            WorkflowTask::new("a", TaskType::Misting).with_labor_hours(9.0),
            1,
            8,
            0,
        )];
        assert!(detect_with(&LaborOverload, &mild, &request).is_empty());

        let warn = [placed(
            WorkflowTask::new("a", TaskType::Misting).with_labor_hours(11.0),
            1,
            8,
            0,
        )];
        let conflicts = detect_with(&LaborOverload, &warn, &request);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Warning);

        let block = [placed(
            WorkflowTask::new("a", TaskType::Misting).with_labor_hours(13.0),
            1,
            8,
            0,
        )];
        let conflicts = detect_with(&LaborOverload, &block, &request);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Critical);
    }

    #[test]
    fn test_labor_overload_splits_by_day() {
        // 12h on each of two days against an 8h ceiling: two findings.
        let request = make_request(8.0);
        let scheduled = [
            placed(
                WorkflowTask::new("a", TaskType::Misting).with_labor_hours(12.0),
                1,
                8,
                0,
            ),
            placed(
                WorkflowTask::new("b", TaskType::Misting).with_labor_hours(12.0),
                2,
                8,
                1,
            ),
        ];
        let conflicts = detect_with(&LaborOverload, &scheduled, &request);
        assert_eq!(conflicts.len(), 2);
    }

    #[test]
    fn test_equipment_double_booking_is_critical() {
        let scheduled = [
            placed(
                WorkflowTask::new("p1", TaskType::SubstratePrep)
                    .with_duration_hours(6.0)
                    .with_equipment("sterilizer"),
                1,
                8,
                0,
            ),
            placed(
                WorkflowTask::new("p2", TaskType::SubstratePrep)
                    .with_duration_hours(6.0)
                    .with_equipment("sterilizer"),
                1,
                10,
                1,
            ),
        ];
        let request = make_request(8.0);
        let conflicts = detect_with(&EquipmentOverAllocation, &scheduled, &request);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Critical);
        assert!(conflicts[0].description.contains("sterilizer"));
    }

    #[test]
    fn test_undeclared_equipment_is_not_tracked() {
        let scheduled = [
            placed(
                WorkflowTask::new("a", TaskType::Harvest)
                    .with_duration_hours(6.0)
                    .with_equipment("harvest-cart"),
                1,
                8,
                0,
            ),
            placed(
                WorkflowTask::new("b", TaskType::Harvest)
                    .with_duration_hours(6.0)
                    .with_equipment("harvest-cart"),
                1,
                10,
                1,
            ),
        ];
        // harvest-cart is not in the request's available set.
        let request = make_request(8.0);
        assert!(detect_with(&EquipmentOverAllocation, &scheduled, &request).is_empty());
    }

    #[test]
    fn test_no_cleaning_at_all_is_critical() {
        let scheduled = [placed(
            WorkflowTask::new("a", TaskType::Misting),
            1,
            8,
            0,
        )];
        let request = make_request(8.0);
        let conflicts = detect_with(&ContaminationRisk, &scheduled, &request);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Critical);
        assert!(conflicts[0].task_ids.is_empty());
    }

    #[test]
    fn test_sparse_cleaning_warns() {
        let scheduled = [
            placed(WorkflowTask::new("c1", TaskType::Cleaning), 1, 8, 0),
            placed(WorkflowTask::new("c2", TaskType::Cleaning), 21, 8, 1),
        ];
        let request = make_request(8.0);
        let conflicts = detect_with(&ContaminationRisk, &scheduled, &request);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Warning);
        assert!(conflicts[0].description.contains("20 day(s)"));
    }

    #[test]
    fn test_weekly_cleaning_passes() {
        let scheduled = [
            placed(WorkflowTask::new("c1", TaskType::Cleaning), 1, 8, 0),
            placed(WorkflowTask::new("c2", TaskType::Cleaning), 8, 8, 1),
            placed(WorkflowTask::new("c3", TaskType::Cleaning), 15, 8, 2),
        ];
        let request = make_request(8.0);
        assert!(detect_with(&ContaminationRisk, &scheduled, &request).is_empty());
    }

    #[test]
    fn test_empty_schedule_raises_nothing() {
        let request = make_request(8.0);
        let detectors: [&dyn ConflictDetector; 7] = [
            &OverlappingTasks,
            &SpeciesIncompatibility,
            &SubstrateBottleneck,
            &HarvestClustering,
            &LaborOverload,
            &EquipmentOverAllocation,
            &ContaminationRisk,
        ];
        for detector in detectors {
            assert!(
                detect_with(detector, &[], &request).is_empty(),
                "{} reported on an empty schedule",
                detector.name()
            );
        }
    }

    #[test]
    fn test_detection_is_idempotent() {
        let scheduled = [
            placed(
                WorkflowTask::new("a", TaskType::Misting)
                    .with_room("room-1")
                    .with_duration_hours(4.0),
                1,
                8,
                0,
            ),
            placed(
                WorkflowTask::new("b", TaskType::Misting)
                    .with_room("room-1")
                    .with_duration_hours(4.0),
                1,
                9,
                1,
            ),
        ];
        let request = make_request(8.0);
        let first = detect_with(&OverlappingTasks, &scheduled, &request);
        let second = detect_with(&OverlappingTasks, &scheduled, &request);
        assert_eq!(first, second);
    }
}
