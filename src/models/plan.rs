//! Workflow plan and approval models.
//!
//! A plan wraps one schedule proposal with grouping, economics and a
//! lifecycle status. Plans are values: transitions never mutate in
//! place, they return the successor plan, and superseded versions are
//! kept by the approval manager rather than deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{PlanId, TaskId};

use super::ScheduleProposal;

/// Lifecycle state of a plan.
///
/// Legal transitions: draft → pending-approval → approved | rejected,
/// approved → active → completed, and any non-completed state →
/// rolled-back. The approval manager owns the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
    Active,
    Completed,
    RolledBack,
}

impl PlanStatus {
    /// Kebab-case tag.
    pub fn tag(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::PendingApproval => "pending-approval",
            PlanStatus::Approved => "approved",
            PlanStatus::Rejected => "rejected",
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
            PlanStatus::RolledBack => "rolled-back",
        }
    }

    /// Completed plans admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Completed)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A named group of scheduled tasks inside a plan, with its economics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubWorkflow {
    /// Group name (species, facility, or caller-chosen).
    pub name: String,
    /// Species the group serves, when grouped by species.
    pub species: Option<String>,
    /// Member tasks, in schedule order.
    pub task_ids: Vec<TaskId>,
    /// Expected harvest weight for the group.
    pub estimated_yield_kg: f64,
    /// Labor cost at the request's labor rate.
    pub estimated_labor_cost: f64,
}

/// Axis on which a plan trades one goal against another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TradeoffDimension {
    LaborVersusYield,
    ContaminationRisk,
    EquipmentUtilization,
}

/// A templated tradeoff narrative attached to a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tradeoff {
    pub dimension: TradeoffDimension,
    pub narrative: String,
}

impl Tradeoff {
    pub fn new(dimension: TradeoffDimension, narrative: impl Into<String>) -> Self {
        Self {
            dimension,
            narrative: narrative.into(),
        }
    }
}

/// An assembled, reviewable plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPlan {
    /// Unique plan identifier.
    pub id: PlanId,
    /// Request this plan answers.
    pub request_id: String,
    /// The underlying schedule.
    pub proposal: ScheduleProposal,
    /// Task groups with per-group economics.
    pub groups: Vec<SubWorkflow>,
    /// Tradeoff narratives.
    pub tradeoffs: Vec<Tradeoff>,
    /// Overall confidence in [0, 100].
    pub confidence: f64,
    /// Lifecycle state.
    pub status: PlanStatus,
    /// Populated by the reject transition only.
    pub rejection_reason: Option<String>,
    /// Populated by the approve transition only.
    pub approval_by: Option<String>,
    /// Populated by the approve transition only.
    pub approved_at: Option<DateTime<Utc>>,
    /// Assembly timestamp.
    pub created_at: DateTime<Utc>,
}

impl WorkflowPlan {
    /// Creates a draft plan around a proposal.
    pub fn new(
        id: PlanId,
        request_id: impl Into<String>,
        proposal: ScheduleProposal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            request_id: request_id.into(),
            proposal,
            groups: Vec::new(),
            tradeoffs: Vec::new(),
            confidence: 0.0,
            status: PlanStatus::Draft,
            rejection_reason: None,
            approval_by: None,
            approved_at: None,
            created_at,
        }
    }

    /// Sets the task groups.
    pub fn with_groups(mut self, groups: Vec<SubWorkflow>) -> Self {
        self.groups = groups;
        self
    }

    /// Sets the tradeoff narratives.
    pub fn with_tradeoffs(mut self, tradeoffs: Vec<Tradeoff>) -> Self {
        self.tradeoffs = tradeoffs;
        self
    }

    /// Sets the overall confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Total expected yield across groups.
    pub fn estimated_yield_kg(&self) -> f64 {
        self.groups.iter().map(|g| g.estimated_yield_kg).sum()
    }

    /// Total labor cost across groups.
    pub fn estimated_labor_cost(&self) -> f64 {
        self.groups.iter().map(|g| g.estimated_labor_cost).sum()
    }
}

/// Decision recorded by a human review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
    PendingRevision,
}

/// Immutable record of one review event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowApproval {
    /// Plan the review applies to.
    pub plan_id: PlanId,
    /// Reviewer identity.
    pub reviewer: String,
    /// The reviewer's call.
    pub decision: ApprovalDecision,
    /// Freeform reviewer comments.
    pub comments: String,
    /// Engine-stamped summary of the evidence behind the decision.
    pub rationale: String,
    /// Conditions attached to the approval, if any.
    pub conditions: Vec<String>,
    /// When the review was recorded.
    pub decided_at: DateTime<Utc>,
}

impl WorkflowApproval {
    /// Records an approval.
    pub fn approved(
        plan_id: PlanId,
        reviewer: impl Into<String>,
        comments: impl Into<String>,
        rationale: impl Into<String>,
        decided_at: DateTime<Utc>,
    ) -> Self {
        Self {
            plan_id,
            reviewer: reviewer.into(),
            decision: ApprovalDecision::Approved,
            comments: comments.into(),
            rationale: rationale.into(),
            conditions: Vec::new(),
            decided_at,
        }
    }

    /// Records a rejection; the reason doubles as the rationale.
    pub fn rejected(
        plan_id: PlanId,
        reviewer: impl Into<String>,
        reason: impl Into<String>,
        decided_at: DateTime<Utc>,
    ) -> Self {
        let reason = reason.into();
        Self {
            plan_id,
            reviewer: reviewer.into(),
            decision: ApprovalDecision::Rejected,
            comments: reason.clone(),
            rationale: reason,
            conditions: Vec::new(),
            decided_at,
        }
    }

    /// Attaches a condition to the review.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ProposalId;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn draft_plan() -> WorkflowPlan {
        WorkflowPlan::new(
            PlanId::new("plan-1"),
            "req-1",
            ScheduleProposal::empty(ProposalId::new("proposal-1"), "test"),
            now(),
        )
    }

    #[test]
    fn test_new_plan_is_draft() {
        let plan = draft_plan();
        assert_eq!(plan.status, PlanStatus::Draft);
        assert!(plan.rejection_reason.is_none());
        assert!(plan.approval_by.is_none());
        assert!(plan.approved_at.is_none());
    }

    #[test]
    fn test_group_totals() {
        let plan = draft_plan().with_groups(vec![
            SubWorkflow {
                name: "oyster".into(),
                species: Some("oyster".into()),
                task_ids: vec![TaskId::new("a")],
                estimated_yield_kg: 12.0,
                estimated_labor_cost: 300.0,
            },
            SubWorkflow {
                name: "shiitake".into(),
                species: Some("shiitake".into()),
                task_ids: vec![TaskId::new("b")],
                estimated_yield_kg: 8.0,
                estimated_labor_cost: 450.0,
            },
        ]);
        assert_eq!(plan.estimated_yield_kg(), 20.0);
        assert_eq!(plan.estimated_labor_cost(), 750.0);
    }

    #[test]
    fn test_only_completed_is_terminal() {
        assert!(PlanStatus::Completed.is_terminal());
        for status in [
            PlanStatus::Draft,
            PlanStatus::PendingApproval,
            PlanStatus::Approved,
            PlanStatus::Rejected,
            PlanStatus::Active,
            PlanStatus::RolledBack,
        ] {
            assert!(!status.is_terminal(), "{status} must not be terminal");
        }
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let json = serde_json::to_string(&PlanStatus::PendingApproval).unwrap();
        assert_eq!(json, "\"pending-approval\"");
        assert_eq!(PlanStatus::RolledBack.to_string(), "rolled-back");
    }

    #[test]
    fn test_rejection_reuses_reason_as_rationale() {
        let approval = WorkflowApproval::rejected(
            PlanId::new("plan-1"),
            "ops-lead",
            "labor ceiling too tight",
            now(),
        );
        assert_eq!(approval.decision, ApprovalDecision::Rejected);
        assert_eq!(approval.rationale, "labor ceiling too tight");
    }
}
