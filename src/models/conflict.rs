//! Conflict model and check results.
//!
//! Conflicts are findings, not errors: the auditor reports every conflict
//! it sees plus an escalated decision, and the caller chooses what to do
//! with a warn. Severity and decision are totally ordered so escalation
//! is a plain `max`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::ids::TaskId;

/// Fixed rationale of a clean check result.
pub const NO_CONFLICTS_RATIONALE: &str = "No conflicts detected";

/// Severity of a single finding. Ordered: `Info < Warning < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Kebab-case tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Gate decision lattice. Ordered: `Allow < Warn < Block`.
///
/// Any critical finding blocks; otherwise any warning warns; otherwise
/// the operation is allowed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    Allow,
    Warn,
    Block,
}

impl Decision {
    /// Maps a single severity onto the lattice.
    pub fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Decision::Block,
            Severity::Warning => Decision::Warn,
            Severity::Info => Decision::Allow,
        }
    }

    /// Lattice join: the more restrictive decision wins.
    pub fn escalate(self, other: Decision) -> Decision {
        self.max(other)
    }

    /// Folds findings into one decision. Empty input allows.
    pub fn from_severities<I>(severities: I) -> Self
    where
        I: IntoIterator<Item = Severity>,
    {
        severities
            .into_iter()
            .map(Decision::from_severity)
            .fold(Decision::Allow, Decision::escalate)
    }

    /// Kebab-case tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Warn => "warn",
            Decision::Block => "block",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Conflict vocabulary. Closed set; each type carries one canned
/// remediation, which is what recommendation deduplication keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictType {
    OverlappingTasks,
    SpeciesIncompatibility,
    SubstrateBottleneck,
    HarvestClustering,
    LaborOverload,
    EquipmentOverAllocation,
    ContaminationRisk,
    DependencyViolation,
}

impl ConflictType {
    /// Kebab-case tag as used in rationales and log payloads.
    pub fn tag(&self) -> &'static str {
        match self {
            ConflictType::OverlappingTasks => "overlapping-tasks",
            ConflictType::SpeciesIncompatibility => "species-incompatibility",
            ConflictType::SubstrateBottleneck => "substrate-bottleneck",
            ConflictType::HarvestClustering => "harvest-clustering",
            ConflictType::LaborOverload => "labor-overload",
            ConflictType::EquipmentOverAllocation => "equipment-over-allocation",
            ConflictType::ContaminationRisk => "contamination-risk",
            ConflictType::DependencyViolation => "dependency-violation",
        }
    }

    /// Canned remediation attached to every conflict of this type.
    pub fn recommendation(&self) -> &'static str {
        match self {
            ConflictType::OverlappingTasks => {
                "Stagger the overlapping tasks or move one of them to a different room"
            }
            ConflictType::SpeciesIncompatibility => {
                "Separate incompatible species transitions onto different days"
            }
            ConflictType::SubstrateBottleneck => {
                "Space substrate preparation runs at least a day apart"
            }
            ConflictType::HarvestClustering => {
                "Spread harvests across adjacent days or bring in extra picking labor"
            }
            ConflictType::LaborOverload => {
                "Rebalance the schedule to bring daily labor under the available ceiling"
            }
            ConflictType::EquipmentOverAllocation => {
                "Serialize tasks that share equipment or provision a second unit"
            }
            ConflictType::ContaminationRisk => {
                "Insert cleaning tasks so no room goes more than two weeks unsanitized"
            }
            ConflictType::DependencyViolation => {
                "Repair the task dependency graph before scheduling"
            }
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A single detected conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConflict {
    /// Classification tag.
    pub conflict_type: ConflictType,
    /// How bad it is.
    pub severity: Severity,
    /// Tasks involved, in detection order.
    pub task_ids: Vec<TaskId>,
    /// What was detected.
    pub description: String,
    /// The type's canned remediation.
    pub recommended_action: String,
}

impl WorkflowConflict {
    /// Creates a conflict; the recommended action comes from the type.
    pub fn new(
        conflict_type: ConflictType,
        severity: Severity,
        task_ids: Vec<TaskId>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            conflict_type,
            severity,
            task_ids,
            description: description.into(),
            recommended_action: conflict_type.recommendation().to_string(),
        }
    }

    /// Two tasks occupying the same room at the same time.
    pub fn overlapping_tasks(severity: Severity, room: &str, a: &TaskId, b: &TaskId) -> Self {
        Self::new(
            ConflictType::OverlappingTasks,
            severity,
            vec![a.clone(), b.clone()],
            format!("Tasks {a} and {b} overlap in room {room}"),
        )
    }

    /// Incompatible species transitioning on the same calendar day.
    pub fn species_incompatibility(
        day: NaiveDate,
        species_a: &str,
        species_b: &str,
        a: &TaskId,
        b: &TaskId,
    ) -> Self {
        Self::new(
            ConflictType::SpeciesIncompatibility,
            Severity::Warning,
            vec![a.clone(), b.clone()],
            format!("{species_a} and {species_b} both transition on {day}; the pair is incompatible"),
        )
    }

    /// Substrate preparation runs packed closer than the spacing floor.
    pub fn substrate_bottleneck(gap_hours: f64, a: &TaskId, b: &TaskId) -> Self {
        Self::new(
            ConflictType::SubstrateBottleneck,
            Severity::Warning,
            vec![a.clone(), b.clone()],
            format!("Substrate preparations {a} and {b} start only {gap_hours:.1}h apart"),
        )
    }

    /// A single day carrying more harvest labor than one crew handles.
    pub fn harvest_clustering(
        day: NaiveDate,
        total_hours: f64,
        cap_hours: f64,
        task_ids: Vec<TaskId>,
    ) -> Self {
        Self::new(
            ConflictType::HarvestClustering,
            Severity::Warning,
            task_ids,
            format!("Harvests on {day} need {total_hours:.1}h of labor (cap {cap_hours:.1}h)"),
        )
    }

    /// Daily labor demand exceeding the availability ceiling.
    pub fn labor_overload(
        severity: Severity,
        day: NaiveDate,
        demand_hours: f64,
        available_hours: f64,
        task_ids: Vec<TaskId>,
    ) -> Self {
        Self::new(
            ConflictType::LaborOverload,
            severity,
            task_ids,
            format!("Labor on {day} needs {demand_hours:.1}h of {available_hours:.1}h available"),
        )
    }

    /// Two tasks booking the same equipment for overlapping windows.
    pub fn equipment_over_allocation(equipment_id: &str, a: &TaskId, b: &TaskId) -> Self {
        Self::new(
            ConflictType::EquipmentOverAllocation,
            Severity::Critical,
            vec![a.clone(), b.clone()],
            format!("Tasks {a} and {b} both book {equipment_id} for overlapping windows"),
        )
    }

    /// Missing or too-sparse cleaning coverage.
    pub fn contamination_risk(
        severity: Severity,
        description: impl Into<String>,
        task_ids: Vec<TaskId>,
    ) -> Self {
        Self::new(ConflictType::ContaminationRisk, severity, task_ids, description)
    }

    /// A broken dependency: unscheduled prerequisite or ordering breach.
    pub fn dependency_violation(description: impl Into<String>, task_ids: Vec<TaskId>) -> Self {
        Self::new(
            ConflictType::DependencyViolation,
            Severity::Critical,
            task_ids,
            description,
        )
    }
}

/// Aggregate result of one conflict check over a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictCheckResult {
    /// Every finding, in detection order.
    pub conflicts: Vec<WorkflowConflict>,
    /// Escalated gate decision.
    pub decision: Decision,
    /// One canned remediation per distinct conflict type, first-seen order.
    pub recommendations: Vec<String>,
    /// Summary line naming the distinct conflict types found.
    pub rationale: String,
    /// When the check ran. The only time-of-call dependent field.
    pub checked_at: DateTime<Utc>,
}

impl ConflictCheckResult {
    /// Assembles a result from findings: the decision, the deduplicated
    /// recommendations and the rationale are all derived here.
    pub fn from_conflicts(conflicts: Vec<WorkflowConflict>, checked_at: DateTime<Utc>) -> Self {
        let decision = Decision::from_severities(conflicts.iter().map(|c| c.severity));

        let mut seen: HashSet<ConflictType> = HashSet::new();
        let mut recommendations = Vec::new();
        let mut distinct_tags = Vec::new();
        for conflict in &conflicts {
            if seen.insert(conflict.conflict_type) {
                recommendations.push(conflict.conflict_type.recommendation().to_string());
                distinct_tags.push(conflict.conflict_type.tag());
            }
        }

        let rationale = if conflicts.is_empty() {
            NO_CONFLICTS_RATIONALE.to_string()
        } else {
            format!(
                "Detected {} conflict(s): {}",
                conflicts.len(),
                distinct_tags.join(", ")
            )
        };

        Self {
            conflicts,
            decision,
            recommendations,
            rationale,
            checked_at,
        }
    }

    /// The clean result.
    pub fn no_conflicts(checked_at: DateTime<Utc>) -> Self {
        Self::from_conflicts(Vec::new(), checked_at)
    }

    /// Whether the decision blocks downstream transitions.
    pub fn is_blocked(&self) -> bool {
        self.decision == Decision::Block
    }

    /// Number of findings at the given severity.
    pub fn count_at(&self, severity: Severity) -> usize {
        self.conflicts
            .iter()
            .filter(|c| c.severity == severity)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_decision_lattice_is_monotone() {
        assert!(Decision::Allow < Decision::Warn);
        assert!(Decision::Warn < Decision::Block);
        assert_eq!(Decision::Allow.escalate(Decision::Warn), Decision::Warn);
        assert_eq!(Decision::Block.escalate(Decision::Warn), Decision::Block);
        // Escalation never weakens an earlier decision.
        assert_eq!(Decision::Block.escalate(Decision::Allow), Decision::Block);
    }

    #[test]
    fn test_decision_from_severities() {
        assert_eq!(Decision::from_severities([]), Decision::Allow);
        assert_eq!(
            Decision::from_severities([Severity::Info, Severity::Warning]),
            Decision::Warn
        );
        assert_eq!(
            Decision::from_severities([Severity::Warning, Severity::Critical, Severity::Info]),
            Decision::Block
        );
    }

    #[test]
    fn test_result_recommendations_dedup_by_type() {
        let a = TaskId::new("a");
        let b = TaskId::new("b");
        let c = TaskId::new("c");
        let conflicts = vec![
            WorkflowConflict::overlapping_tasks(Severity::Warning, "room-1", &a, &b),
            WorkflowConflict::overlapping_tasks(Severity::Warning, "room-1", &b, &c),
            WorkflowConflict::equipment_over_allocation("sterilizer", &a, &c),
        ];
        let result = ConflictCheckResult::from_conflicts(conflicts, now());

        // Two distinct types → exactly two recommendations, first-seen order.
        assert_eq!(result.recommendations.len(), 2);
        assert_eq!(
            result.recommendations[0],
            ConflictType::OverlappingTasks.recommendation()
        );
        assert_eq!(
            result.recommendations[1],
            ConflictType::EquipmentOverAllocation.recommendation()
        );
        assert_eq!(result.decision, Decision::Block);
        assert_eq!(
            result.rationale,
            "Detected 3 conflict(s): overlapping-tasks, equipment-over-allocation"
        );
    }

    #[test]
    fn test_clean_result_has_fixed_rationale() {
        let result = ConflictCheckResult::no_conflicts(now());
        assert_eq!(result.decision, Decision::Allow);
        assert!(result.conflicts.is_empty());
        assert!(result.recommendations.is_empty());
        assert_eq!(result.rationale, NO_CONFLICTS_RATIONALE);
    }

    #[test]
    fn test_factory_wires_canned_recommendation() {
        let a = TaskId::new("a");
        let b = TaskId::new("b");
        let conflict = WorkflowConflict::substrate_bottleneck(5.0, &a, &b);
        assert_eq!(conflict.conflict_type, ConflictType::SubstrateBottleneck);
        assert_eq!(conflict.severity, Severity::Warning);
        assert_eq!(
            conflict.recommended_action,
            ConflictType::SubstrateBottleneck.recommendation()
        );
        assert!(conflict.description.contains("5.0h"));
    }
}
