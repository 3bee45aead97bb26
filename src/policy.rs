//! Policy auditing for assembled plans.
//!
//! The conflict auditor judges the schedule; the policy auditor judges
//! the plan. Four independent checks cover species timelines, substrate
//! handling, facility limits and labor, each against the catalogs and
//! the request's constraints. A fifth concern, regression against the
//! previously approved plan, never blocks on its own but keeps a
//! quietly worse plan from sailing through unnoticed.
//!
//! # Checks
//!
//! | Check      | Critical when                          | Warns when                     |
//! |------------|----------------------------------------|--------------------------------|
//! | `timeline` | dependency or stage order is broken    | a stage runs under its minimum |
//! | `substrate`| inoculation lands in uncooled substrate| sterilization is cut short     |
//! | `facility` | room capacity or temperature is broken | equipment is undeclared        |
//! | `labor`    | a day needs over 1.5x available labor  | a day needs over available     |

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::ids::TaskId;
use crate::models::{
    AuditCheck, AuditIssue, Decision, LifecycleStage, PlanBaseline, ScheduledTask,
    SpeciesCatalog, SubstrateCatalog, TaskType, WorkflowAuditResult, WorkflowPlan,
    WorkflowRequest,
};

/// Daily labor demand above `available * ratio` is critical.
const LABOR_HARD_RATIO: f64 = 1.5;

/// Audits assembled plans against cultivation policy.
#[derive(Debug, Clone)]
pub struct PolicyAuditor {
    species: SpeciesCatalog,
    substrates: SubstrateCatalog,
}

impl PolicyAuditor {
    /// Creates an auditor over the standard catalogs.
    pub fn new() -> Self {
        Self {
            species: SpeciesCatalog::standard(),
            substrates: SubstrateCatalog::standard(),
        }
    }

    /// Replaces the species catalog.
    pub fn with_catalog(mut self, species: SpeciesCatalog) -> Self {
        self.species = species;
        self
    }

    /// Replaces the substrate catalog.
    pub fn with_substrates(mut self, substrates: SubstrateCatalog) -> Self {
        self.substrates = substrates;
        self
    }

    /// Runs the four checks plus regression detection.
    ///
    /// `baseline` is the metrics snapshot of the previously approved
    /// plan, when one exists. A detected regression floors the decision
    /// at warn; it never blocks by itself.
    pub fn run_audit(
        &self,
        plan: &WorkflowPlan,
        request: &WorkflowRequest,
        baseline: Option<&PlanBaseline>,
    ) -> WorkflowAuditResult {
        let scheduled = &plan.proposal.tasks;

        let timeline = AuditCheck::from_issues("timeline", self.timeline_issues(scheduled));
        let substrate = AuditCheck::from_issues("substrate", self.substrate_issues(scheduled));
        let facility = AuditCheck::from_issues("facility", self.facility_issues(scheduled, request));
        let labor = AuditCheck::from_issues("labor", labor_issues(scheduled, request));

        let regression_detected = baseline
            .map(|b| b.regressed_by(&PlanBaseline::from_plan(plan)))
            .unwrap_or(false);

        let checks = [&timeline, &substrate, &facility, &labor];
        let mut decision = Decision::from_severities(
            checks
                .iter()
                .flat_map(|check| check.issues.iter().map(|issue| issue.severity)),
        );
        if regression_detected {
            decision = decision.escalate(Decision::Warn);
        }

        let mut recommendations = Vec::new();
        if !timeline.passed {
            recommendations
                .push("Re-run scheduling so stage minimums and dependency order hold".to_string());
        }
        if !substrate.passed {
            recommendations
                .push("Extend sterilization or cooling windows before inoculation".to_string());
        }
        if !facility.passed {
            recommendations
                .push("Re-room the flagged tasks or relax the facility constraints".to_string());
        }
        if !labor.passed {
            recommendations.push("Rebalance daily labor below the available ceiling".to_string());
        }
        if regression_detected {
            recommendations
                .push("Review the regression against the previously approved plan".to_string());
        }

        let rollback_steps = if decision == Decision::Block {
            vec![
                "Keep the previously approved plan active".to_string(),
                "Return this plan to draft and rework the flagged tasks".to_string(),
                "Re-run the policy audit before resubmitting".to_string(),
            ]
        } else {
            Vec::new()
        };

        let result = WorkflowAuditResult {
            plan_id: plan.id.clone(),
            timeline,
            substrate,
            facility,
            labor,
            regression_detected,
            decision,
            recommendations,
            rollback_steps,
            audited_at: Utc::now(),
        };
        debug!(
            plan_id = %result.plan_id,
            decision = %result.decision,
            issue_count = result.issue_count(),
            regression = result.regression_detected,
            "policy audit complete"
        );
        result
    }

    /// Dependency order, per-species stage order, and stage minimums.
    fn timeline_issues(&self, scheduled: &[ScheduledTask]) -> Vec<AuditIssue> {
        let placed = by_id(scheduled);
        let mut issues = Vec::new();

        for entry in scheduled {
            for dep in &entry.task.depends_on {
                if let Some(dep_entry) = placed.get(dep) {
                    if entry.start < dep_entry.end {
                        issues.push(
                            AuditIssue::critical(format!(
                                "Task {} starts before its dependency {dep} ends",
                                entry.task.id
                            ))
                            .with_tasks(vec![entry.task.id.clone(), dep.clone()]),
                        );
                    }
                }
            }
        }

        // Stage order holds per species regardless of declared
        // dependencies, so hand-assembled schedules are covered too.
        // Compared on the earliest start per stage: with several batches
        // of one species, a later batch's prep may legitimately start
        // after an earlier batch's harvest.
        let mut stage_firsts: BTreeMap<&str, BTreeMap<u8, &ScheduledTask>> = BTreeMap::new();
        for entry in scheduled {
            let species = match entry.task.species.as_deref() {
                Some(s) => s,
                None => continue,
            };
            let rank = match production_stage_rank(entry.task.task_type) {
                Some(r) => r,
                None => continue,
            };
            stage_firsts
                .entry(species)
                .or_default()
                .entry(rank)
                .and_modify(|first| {
                    if entry.start < first.start {
                        *first = entry;
                    }
                })
                .or_insert(entry);
        }
        for (species, stages) in &stage_firsts {
            let ordered: Vec<&&ScheduledTask> = stages.values().collect();
            for pair in ordered.windows(2) {
                let (earlier, later) = (pair[0], pair[1]);
                if later.start < earlier.start {
                    issues.push(
                        AuditIssue::critical(format!(
                            "{species} {} starts before its {}",
                            later.task.task_type, earlier.task.task_type
                        ))
                        .with_tasks(vec![earlier.task.id.clone(), later.task.id.clone()]),
                    );
                }
            }
        }

        for entry in scheduled {
            let species = match entry.task.species.as_deref() {
                Some(s) => s,
                None => continue,
            };
            let profile = match self.species.profile(species) {
                Some(p) => p,
                None => continue,
            };
            match entry.task.task_type {
                TaskType::FruitingTransition => {
                    if let Some(incubation) =
                        dependency_of_type(entry, &placed, TaskType::IncubationTransition)
                    {
                        let days = (entry.start_day() - incubation.start_day()).num_days();
                        if days < profile.min_incubation_days {
                            issues.push(
                                AuditIssue::warning(format!(
                                    "{species} incubates for {days} day(s); the minimum is {} day(s)",
                                    profile.min_incubation_days
                                ))
                                .with_tasks(vec![
                                    incubation.task.id.clone(),
                                    entry.task.id.clone(),
                                ]),
                            );
                        }
                    }
                }
                TaskType::Harvest => {
                    if let Some(fruiting) =
                        dependency_of_type(entry, &placed, TaskType::FruitingTransition)
                    {
                        let days = (entry.start_day() - fruiting.start_day()).num_days();
                        if days < profile.min_fruiting_days {
                            issues.push(
                                AuditIssue::warning(format!(
                                    "{species} fruits for {days} day(s); the minimum is {} day(s)",
                                    profile.min_fruiting_days
                                ))
                                .with_tasks(vec![fruiting.task.id.clone(), entry.task.id.clone()]),
                            );
                        }
                    }
                }
                _ => {}
            }
        }
        issues
    }

    /// Sterilization and cooling minimums per substrate.
    fn substrate_issues(&self, scheduled: &[ScheduledTask]) -> Vec<AuditIssue> {
        let placed = by_id(scheduled);
        let mut issues = Vec::new();

        for entry in scheduled {
            let substrate = match self.substrate_for(&entry.task.species) {
                Some(s) => s,
                None => continue,
            };
            match entry.task.task_type {
                TaskType::SubstratePrep => {
                    if entry.task.duration_hours < substrate.sterilize_hours {
                        issues.push(
                            AuditIssue::warning(format!(
                                "Preparation {} allows {:.1}h; {} needs {:.1}h of sterilization",
                                entry.task.id,
                                entry.task.duration_hours,
                                substrate.substrate,
                                substrate.sterilize_hours
                            ))
                            .with_tasks(vec![entry.task.id.clone()]),
                        );
                    }
                }
                TaskType::Inoculation => {
                    if let Some(prep) =
                        dependency_of_type(entry, &placed, TaskType::SubstratePrep)
                    {
                        let gap_hours = (entry.start - prep.end).num_minutes() as f64 / 60.0;
                        if gap_hours < substrate.cooling_hours {
                            issues.push(
                                AuditIssue::critical(format!(
                                    "Inoculation {} starts {gap_hours:.1}h after preparation; \
                                     {} needs {:.1}h of cooling",
                                    entry.task.id, substrate.substrate, substrate.cooling_hours
                                ))
                                .with_tasks(vec![prep.task.id.clone(), entry.task.id.clone()]),
                            );
                        }
                    }
                }
                _ => {}
            }
        }
        issues
    }

    /// Room capacity, room temperature and equipment references.
    fn facility_issues(
        &self,
        scheduled: &[ScheduledTask],
        request: &WorkflowRequest,
    ) -> Vec<AuditIssue> {
        let mut issues = Vec::new();

        let mut by_room: BTreeMap<&str, Vec<&ScheduledTask>> = BTreeMap::new();
        for entry in scheduled {
            if let Some(room) = entry.task.room.as_deref() {
                by_room.entry(room).or_default().push(entry);
            }
        }

        for (room, group) in &by_room {
            if let Some(&capacity) = request.constraints.room_capacity.get(*room) {
                let peak = peak_occupancy(group);
                if peak > capacity {
                    issues.push(
                        AuditIssue::critical(format!(
                            "Room {room} peaks at {peak} concurrent task(s); capacity is {capacity}"
                        ))
                        .with_tasks(group.iter().map(|e| e.task.id.clone()).collect()),
                    );
                }
            }

            if let Some(bounds) = request.constraints.room_temperature.get(*room) {
                for entry in group {
                    let species = match entry.task.species.as_deref() {
                        Some(s) => s,
                        None => continue,
                    };
                    let profile = match self.species.profile(species) {
                        Some(p) => p,
                        None => continue,
                    };
                    let required = match entry.task.lifecycle_stage() {
                        LifecycleStage::Incubation => profile.incubation_temp_c,
                        LifecycleStage::Fruiting => profile.fruiting_temp_c,
                        _ => continue,
                    };
                    if !bounds.admits(required) {
                        issues.push(
                            AuditIssue::critical(format!(
                                "Room {room} holds {:.0}-{:.0}C; {species} needs {:.0}-{:.0}C here",
                                bounds.min_c, bounds.max_c, required.0, required.1
                            ))
                            .with_tasks(vec![entry.task.id.clone()]),
                        );
                    }
                }
            }
        }

        if !request.constraints.available_equipment.is_empty() {
            let mut undeclared: Vec<(String, TaskId)> = Vec::new();
            for entry in scheduled {
                for equipment in &entry.equipment_ids {
                    if !request
                        .constraints
                        .available_equipment
                        .iter()
                        .any(|id| id == equipment)
                    {
                        undeclared.push((equipment.clone(), entry.task.id.clone()));
                    }
                }
            }
            undeclared.sort();
            undeclared.dedup();
            for (equipment, task_id) in undeclared {
                issues.push(
                    AuditIssue::warning(format!(
                        "Task {task_id} uses {equipment}, which is not declared available"
                    ))
                    .with_tasks(vec![task_id]),
                );
            }
        }

        issues
    }

    fn substrate_for(
        &self,
        species: &Option<String>,
    ) -> Option<&crate::models::SubstrateProfile> {
        let species = species.as_deref()?;
        let profile = self.species.profile(species)?;
        self.substrates.profile(&profile.substrate)
    }
}

impl Default for PolicyAuditor {
    fn default() -> Self {
        Self::new()
    }
}

/// Daily labor totals versus the declared ceiling. Demand is attributed
/// to the task's start day, matching the conflict auditor.
fn labor_issues(scheduled: &[ScheduledTask], request: &WorkflowRequest) -> Vec<AuditIssue> {
    let available = request.constraints.labor_hours_available;
    let mut by_day: BTreeMap<NaiveDate, Vec<&ScheduledTask>> = BTreeMap::new();
    for entry in scheduled {
        by_day.entry(entry.start_day()).or_default().push(entry);
    }

    let mut issues = Vec::new();
    for (day, group) in &by_day {
        let demand: f64 = group.iter().map(|e| e.assigned_labor_hours).sum();
        let task_ids: Vec<TaskId> = group.iter().map(|e| e.task.id.clone()).collect();
        if demand > available * LABOR_HARD_RATIO {
            issues.push(
                AuditIssue::critical(format!(
                    "{day} needs {demand:.1}h of labor; {available:.1}h is available"
                ))
                .with_tasks(task_ids),
            );
        } else if demand > available {
            issues.push(
                AuditIssue::warning(format!(
                    "{day} needs {demand:.1}h of labor against {available:.1}h available"
                ))
                .with_tasks(task_ids),
            );
        }
    }
    issues
}

fn by_id(scheduled: &[ScheduledTask]) -> HashMap<&TaskId, &ScheduledTask> {
    scheduled.iter().map(|entry| (&entry.task.id, entry)).collect()
}

/// Rank of a task type within the production chain. Tasks outside the
/// chain (misting, cleaning, monitoring, ...) carry no ordering
/// obligation.
fn production_stage_rank(task_type: TaskType) -> Option<u8> {
    match task_type {
        TaskType::SubstratePrep => Some(0),
        TaskType::Inoculation => Some(1),
        TaskType::IncubationTransition => Some(2),
        TaskType::FruitingTransition => Some(3),
        TaskType::Harvest => Some(4),
        _ => None,
    }
}

/// First scheduled dependency of the given type, if any.
fn dependency_of_type<'a>(
    entry: &ScheduledTask,
    placed: &HashMap<&TaskId, &'a ScheduledTask>,
    task_type: TaskType,
) -> Option<&'a ScheduledTask> {
    entry
        .task
        .depends_on
        .iter()
        .filter_map(|dep| placed.get(dep).copied())
        .find(|dep_entry| dep_entry.task.task_type == task_type)
}

/// Highest number of tasks active at once, on half-open windows.
fn peak_occupancy(group: &[&ScheduledTask]) -> usize {
    let mut events: Vec<(DateTime<Utc>, i32)> = Vec::with_capacity(group.len() * 2);
    for entry in group {
        events.push((entry.start, 1));
        events.push((entry.end, -1));
    }
    // Ends sort before starts at the same instant, so touching
    // tasks never count as concurrent.
    events.sort_by_key(|&(at, delta)| (at, delta));

    let mut current = 0i32;
    let mut peak = 0i32;
    for (_, delta) in events {
        current += delta;
        peak = peak.max(current);
    }
    peak.max(0) as usize
}
