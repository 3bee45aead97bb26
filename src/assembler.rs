//! Plan assembly.
//!
//! Turns a checked schedule proposal into a reviewable draft plan:
//! tasks are grouped into sub-workflows with per-group economics,
//! tradeoff narratives are templated from the request's weighting and
//! the conflict findings, and the proposal's confidence is discounted
//! by the conflict burden.
//!
//! Yield is only estimated for harvests whose species has a catalog
//! profile; unknown species contribute labor cost but no yield.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ids::{IdGenerator, PlanId, TaskId};
use crate::models::{
    ConflictCheckResult, ConflictType, ScheduledTask, ScheduleProposal, Severity, SpeciesCatalog,
    SubWorkflow, TaskType, Tradeoff, TradeoffDimension, WorkflowPlan, WorkflowRequest,
};

/// Group name for tasks no strategy can place.
const GENERAL_GROUP: &str = "general";

/// How tasks are grouped into sub-workflows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupingStrategy {
    /// Group by species, falling back to facility, then to `general`.
    #[default]
    BySpecies,
    /// Group by facility, falling back to `general`.
    ByFacility,
    /// Caller-supplied group per task; unmapped tasks land in `general`.
    Custom(HashMap<TaskId, String>),
}

/// Assembles draft plans from checked proposals.
#[derive(Debug, Clone)]
pub struct PlanAssembler {
    ids: Arc<dyn IdGenerator>,
    species: SpeciesCatalog,
    strategy: GroupingStrategy,
}

impl PlanAssembler {
    /// Creates an assembler with the standard catalog, grouping by species.
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            ids,
            species: SpeciesCatalog::standard(),
            strategy: GroupingStrategy::BySpecies,
        }
    }

    /// Replaces the species catalog.
    pub fn with_catalog(mut self, species: SpeciesCatalog) -> Self {
        self.species = species;
        self
    }

    /// Replaces the grouping strategy.
    pub fn with_strategy(mut self, strategy: GroupingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Assembles a draft plan around the proposal.
    ///
    /// The proposal is embedded as-is; the conflict result only feeds
    /// the confidence discount and the contamination narrative, so the
    /// plan carries no stale copy of it.
    pub fn assemble(
        &self,
        request: &WorkflowRequest,
        proposal: ScheduleProposal,
        conflicts: &ConflictCheckResult,
        created_at: DateTime<Utc>,
    ) -> WorkflowPlan {
        let id = PlanId::generate(&*self.ids);

        let mut grouped: BTreeMap<String, Vec<&ScheduledTask>> = BTreeMap::new();
        for entry in &proposal.tasks {
            grouped.entry(self.group_key(entry)).or_default().push(entry);
        }
        let groups: Vec<SubWorkflow> = grouped
            .iter()
            .map(|(name, members)| {
                self.build_group(name.clone(), members, request.constraints.labor_rate)
            })
            .collect();

        let estimated_yield_kg: f64 = groups.iter().map(|g| g.estimated_yield_kg).sum();
        let tradeoffs = self.tradeoffs(request, &proposal, conflicts, estimated_yield_kg);
        let confidence = discounted_confidence(&proposal, conflicts);

        debug!(
            plan_id = %id,
            group_count = groups.len(),
            confidence,
            "assembled draft plan"
        );

        WorkflowPlan::new(id, request.id.clone(), proposal, created_at)
            .with_groups(groups)
            .with_tradeoffs(tradeoffs)
            .with_confidence(confidence)
    }

    fn group_key(&self, entry: &ScheduledTask) -> String {
        match &self.strategy {
            GroupingStrategy::BySpecies => entry
                .task
                .species
                .clone()
                .or_else(|| entry.task.facility.clone())
                .unwrap_or_else(|| GENERAL_GROUP.to_string()),
            GroupingStrategy::ByFacility => entry
                .task
                .facility
                .clone()
                .unwrap_or_else(|| GENERAL_GROUP.to_string()),
            GroupingStrategy::Custom(map) => map
                .get(&entry.task.id)
                .cloned()
                .unwrap_or_else(|| GENERAL_GROUP.to_string()),
        }
    }

    fn build_group(&self, name: String, members: &[&ScheduledTask], labor_rate: f64) -> SubWorkflow {
        let mut species: Option<String> = None;
        let mut uniform = true;
        for member in members {
            if let Some(s) = member.task.species.as_deref() {
                match species.as_deref() {
                    None => species = Some(s.to_string()),
                    Some(prev) if prev != s => uniform = false,
                    _ => {}
                }
            }
        }
        if !uniform {
            species = None;
        }

        let estimated_yield_kg: f64 = members
            .iter()
            .filter(|m| m.task.task_type == TaskType::Harvest)
            .map(|m| {
                let rate = m
                    .task
                    .species
                    .as_deref()
                    .and_then(|s| self.species.profile(s))
                    .map(|p| p.yield_per_labor_hour_kg)
                    .unwrap_or(0.0);
                m.assigned_labor_hours * rate
            })
            .sum();
        let total_labor: f64 = members.iter().map(|m| m.assigned_labor_hours).sum();

        SubWorkflow {
            name,
            species,
            task_ids: members.iter().map(|m| m.task.id.clone()).collect(),
            estimated_yield_kg,
            estimated_labor_cost: total_labor * labor_rate,
        }
    }

    fn tradeoffs(
        &self,
        request: &WorkflowRequest,
        proposal: &ScheduleProposal,
        conflicts: &ConflictCheckResult,
        estimated_yield_kg: f64,
    ) -> Vec<Tradeoff> {
        let labor = proposal.total_labor_hours;
        let labor_vs_yield = if request.weighting.prioritize_yield {
            format!(
                "Yield-weighted: {estimated_yield_kg:.1} kg expected from {labor:.1}h of labor; \
                 extra labor is accepted where it buys harvest weight"
            )
        } else if request.weighting.minimize_labor {
            format!(
                "Labor-lean: {labor:.1}h of labor for {estimated_yield_kg:.1} kg; trimmed \
                 monitoring raises the cost of a missed contamination sign"
            )
        } else {
            format!(
                "{estimated_yield_kg:.1} kg expected from {labor:.1}h of labor, with no \
                 weighting applied"
            )
        };

        let contamination_findings = conflicts
            .conflicts
            .iter()
            .filter(|c| c.conflict_type == ConflictType::ContaminationRisk)
            .count();
        let contamination = if contamination_findings == 0 {
            "Cleaning coverage meets the two-week rule; contamination exposure is routine"
                .to_string()
        } else {
            format!(
                "{contamination_findings} contamination finding(s) stand; tighter cleaning \
                 would trade labor hours for biological safety"
            )
        };

        let peak = proposal
            .equipment_utilization
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal));
        let equipment = match peak {
            Some((id, pct)) => format!(
                "Peak equipment load is {id} at {pct:.0}%; smoothing it would stretch the schedule"
            ),
            None => "No equipment is tracked by this schedule".to_string(),
        };

        vec![
            Tradeoff::new(TradeoffDimension::LaborVersusYield, labor_vs_yield),
            Tradeoff::new(TradeoffDimension::ContaminationRisk, contamination),
            Tradeoff::new(TradeoffDimension::EquipmentUtilization, equipment),
        ]
    }
}

/// Scales the proposal's confidence by the conflict burden, rounded to
/// a tenth. Criticals weigh three warnings; the discount caps at half.
fn discounted_confidence(proposal: &ScheduleProposal, conflicts: &ConflictCheckResult) -> f64 {
    let criticals = conflicts.count_at(Severity::Critical) as f64;
    let warnings = conflicts.count_at(Severity::Warning) as f64;
    let task_count = proposal.task_count().max(1) as f64;
    let burden = (0.1 * (criticals * 3.0 + warnings) / task_count).min(0.5);
    (proposal.confidence * (1.0 - burden) * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ProposalId;
    use crate::models::{ConstraintSet, DateRange, WeightingFlags, WorkflowConflict, WorkflowTask};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    fn make_request() -> WorkflowRequest {
        let window = DateRange::new(now(), now() + Duration::days(30));
        WorkflowRequest::new("req-1", window).with_constraints(ConstraintSet::new(8.0))
    }

    fn make_proposal(tasks: Vec<ScheduledTask>) -> ScheduleProposal {
        let total_labor_hours = tasks.iter().map(|t| t.assigned_labor_hours).sum();
        ScheduleProposal {
            id: ProposalId::new("proposal-1"),
            tasks,
            range: None,
            total_labor_hours,
            equipment_utilization: HashMap::new(),
            rationale: "test".to_string(),
            confidence: 80.0,
            risk_factors: Vec::new(),
        }
    }

    fn assembler() -> PlanAssembler {
        PlanAssembler::new(Arc::new(crate::ids::SequentialIdGenerator::new()))
    }

    #[test]
    fn test_groups_by_species_with_economics() {
        let proposal = make_proposal(vec![
            ScheduledTask::place(
                WorkflowTask::new("h-oy", TaskType::Harvest)
                    .with_species("oyster")
                    .with_labor_hours(6.0),
                now(),
                0,
            ),
            ScheduledTask::place(
                WorkflowTask::new("h-sh", TaskType::Harvest)
                    .with_species("shiitake")
                    .with_labor_hours(5.0),
                now(),
                1,
            ),
            ScheduledTask::place(
                WorkflowTask::new("clean", TaskType::Cleaning).with_labor_hours(2.0),
                now(),
                2,
            ),
        ]);
        let conflicts = ConflictCheckResult::no_conflicts(now());
        let plan = assembler().assemble(&make_request(), proposal, &conflicts, now());

        assert_eq!(plan.groups.len(), 3);
        let names: Vec<&str> = plan.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["general", "oyster", "shiitake"]);

        let oyster = &plan.groups[1];
        assert_eq!(oyster.species.as_deref(), Some("oyster"));
        // 6h of harvest labor at 2.5 kg per labor hour.
        assert_eq!(oyster.estimated_yield_kg, 15.0);
        // 6h at the default 20.0 rate.
        assert_eq!(oyster.estimated_labor_cost, 120.0);

        let shiitake = &plan.groups[2];
        assert_eq!(shiitake.estimated_yield_kg, 6.0);

        // Cleaning earns no yield but costs labor.
        let general = &plan.groups[0];
        assert_eq!(general.estimated_yield_kg, 0.0);
        assert_eq!(general.estimated_labor_cost, 40.0);
    }

    #[test]
    fn test_clean_check_keeps_proposal_confidence() {
        let proposal = make_proposal(vec![ScheduledTask::place(
            WorkflowTask::new("a", TaskType::Misting),
            now(),
            0,
        )]);
        let conflicts = ConflictCheckResult::no_conflicts(now());
        let plan = assembler().assemble(&make_request(), proposal, &conflicts, now());
        assert_eq!(plan.confidence, 80.0);
    }

    #[test]
    fn test_conflicts_discount_confidence() {
        let tasks: Vec<ScheduledTask> = (0..4)
            .map(|i| {
                ScheduledTask::place(
                    WorkflowTask::new(format!("t{i}"), TaskType::Misting),
                    now(),
                    i,
                )
            })
            .collect();
        let proposal = make_proposal(tasks);
        let a = TaskId::new("t0");
        let b = TaskId::new("t1");
        let conflicts = ConflictCheckResult::from_conflicts(
            vec![
                WorkflowConflict::equipment_over_allocation("sterilizer", &a, &b),
                WorkflowConflict::substrate_bottleneck(4.0, &a, &b),
            ],
            now(),
        );
        let plan = assembler().assemble(&make_request(), proposal, &conflicts, now());

        // One critical (x3) plus one warning over four tasks:
        // 80 * (1 - 0.1 * 4 / 4) = 72.
        assert_eq!(plan.confidence, 72.0);
    }

    #[test]
    fn test_custom_strategy_places_unmapped_tasks_in_general() {
        let mut mapping = HashMap::new();
        mapping.insert(TaskId::new("a"), "flush-1".to_string());
        let proposal = make_proposal(vec![
            ScheduledTask::place(WorkflowTask::new("a", TaskType::Misting), now(), 0),
            ScheduledTask::place(WorkflowTask::new("b", TaskType::Misting), now(), 1),
        ]);
        let conflicts = ConflictCheckResult::no_conflicts(now());
        let plan = assembler()
            .with_strategy(GroupingStrategy::Custom(mapping))
            .assemble(&make_request(), proposal, &conflicts, now());

        let names: Vec<&str> = plan.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["flush-1", "general"]);
    }

    #[test]
    fn test_tradeoffs_reflect_weighting() {
        let proposal = make_proposal(vec![ScheduledTask::place(
            WorkflowTask::new("h", TaskType::Harvest)
                .with_species("oyster")
                .with_labor_hours(4.0),
            now(),
            0,
        )]);
        let conflicts = ConflictCheckResult::no_conflicts(now());
        let request = make_request().with_weighting(WeightingFlags {
            prioritize_yield: true,
            minimize_labor: false,
        });
        let plan = assembler().assemble(&request, proposal, &conflicts, now());

        assert_eq!(plan.tradeoffs.len(), 3);
        let labor_axis = plan
            .tradeoffs
            .iter()
            .find(|t| t.dimension == TradeoffDimension::LaborVersusYield)
            .unwrap();
        assert!(labor_axis.narrative.starts_with("Yield-weighted"));
    }

    #[test]
    fn test_mixed_species_group_has_no_species() {
        let mut mapping = HashMap::new();
        mapping.insert(TaskId::new("a"), "mixed".to_string());
        mapping.insert(TaskId::new("b"), "mixed".to_string());
        let proposal = make_proposal(vec![
            ScheduledTask::place(
                WorkflowTask::new("a", TaskType::Misting).with_species("oyster"),
                now(),
                0,
            ),
            ScheduledTask::place(
                WorkflowTask::new("b", TaskType::Misting).with_species("shiitake"),
                now(),
                1,
            ),
        ]);
        let conflicts = ConflictCheckResult::no_conflicts(now());
        let plan = assembler()
            .with_strategy(GroupingStrategy::Custom(mapping))
            .assemble(&make_request(), proposal, &conflicts, now());

        assert_eq!(plan.groups.len(), 1);
        assert!(plan.groups[0].species.is_none());
    }
}
