//! Plan approval lifecycle.
//!
//! Plans move draft → pending-approval → approved → active → completed,
//! with rejection as an exit from review and rollback as an exit from
//! everything but completion. Transitions are pure: [`allowed`] is the
//! whole table, and illegal moves return errors without touching state.
//!
//! The [`ApprovalManager`] is the ledger on top: it keeps each plan's
//! current version, its conflict check, its latest policy audit, the
//! previously approved version for rollback, and the review history.
//! It holds no locks; it takes `&mut self` for every state change and
//! leaves serialization of same-plan access to the caller.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{EngineError, EngineResult};
use crate::ids::PlanId;
use crate::models::{
    ConflictCheckResult, Decision, PlanBaseline, PlanStatus, WorkflowApproval,
    WorkflowAuditResult, WorkflowPlan,
};

/// Whether a status transition is legal.
///
/// Rollback is reachable from every non-terminal status; everything
/// else follows the review pipeline.
pub fn allowed(from: PlanStatus, to: PlanStatus) -> bool {
    use PlanStatus::*;
    matches!(
        (from, to),
        (Draft, PendingApproval)
            | (PendingApproval, Approved)
            | (PendingApproval, Rejected)
            | (Approved, Active)
            | (Active, Completed)
    ) || (to == RolledBack && !from.is_terminal())
}

/// Returns the successor plan for a legal transition.
fn transition(
    plan: &WorkflowPlan,
    to: PlanStatus,
    action: &'static str,
) -> EngineResult<WorkflowPlan> {
    if !allowed(plan.status, to) {
        return Err(EngineError::InvalidTransition {
            plan_id: plan.id.clone(),
            from: plan.status,
            action,
        });
    }
    let mut next = plan.clone();
    next.status = to;
    Ok(next)
}

/// Everything the ledger tracks for one plan.
#[derive(Debug, Clone)]
pub struct PlanRecord {
    /// Current version of the plan.
    pub plan: WorkflowPlan,
    /// Conflict check the plan was registered with.
    pub conflict: ConflictCheckResult,
    /// Latest policy audit, once one has run.
    pub audit: Option<WorkflowAuditResult>,
    /// Approved version preserved for rollback.
    pub previous_approved: Option<WorkflowPlan>,
    /// Review history, oldest first.
    pub approvals: Vec<WorkflowApproval>,
}

/// In-memory plan ledger with gated lifecycle transitions.
#[derive(Debug, Default)]
pub struct ApprovalManager {
    plans: HashMap<PlanId, PlanRecord>,
}

impl ApprovalManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plan together with its conflict check. A plan
    /// re-registered under the same ID replaces the earlier record.
    pub fn register(&mut self, plan: WorkflowPlan, conflict: ConflictCheckResult) {
        self.plans.insert(
            plan.id.clone(),
            PlanRecord {
                plan,
                conflict,
                audit: None,
                previous_approved: None,
                approvals: Vec::new(),
            },
        );
    }

    /// Records a policy audit for the plan. Refused once completed.
    pub fn record_audit(
        &mut self,
        plan_id: &PlanId,
        audit: WorkflowAuditResult,
    ) -> EngineResult<()> {
        let record = self.record_mut(plan_id)?;
        if record.plan.status.is_terminal() {
            return Err(EngineError::InvalidTransition {
                plan_id: plan_id.clone(),
                from: record.plan.status,
                action: "record an audit",
            });
        }
        record.audit = Some(audit);
        Ok(())
    }

    /// The current version of a plan.
    pub fn plan(&self, plan_id: &PlanId) -> EngineResult<&WorkflowPlan> {
        self.record(plan_id).map(|record| &record.plan)
    }

    /// The full ledger record of a plan.
    pub fn record(&self, plan_id: &PlanId) -> EngineResult<&PlanRecord> {
        self.plans
            .get(plan_id)
            .ok_or_else(|| EngineError::UnknownPlan(plan_id.clone()))
    }

    /// Metrics of the plan's preserved approved version, for
    /// regression comparison. `None` until something was approved.
    pub fn baseline(&self, plan_id: &PlanId) -> EngineResult<Option<PlanBaseline>> {
        Ok(self
            .record(plan_id)?
            .previous_approved
            .as_ref()
            .map(PlanBaseline::from_plan))
    }

    /// Every registered plan, in no particular order.
    pub fn plans(&self) -> impl Iterator<Item = &WorkflowPlan> {
        self.plans.values().map(|record| &record.plan)
    }

    /// Submits a draft for review. Gated on the registered conflict
    /// check: a blocking schedule cannot enter review.
    pub fn submit(&mut self, plan_id: &PlanId) -> EngineResult<&WorkflowPlan> {
        let record = self.record_mut(plan_id)?;
        let next = transition(&record.plan, PlanStatus::PendingApproval, "submit")?;
        if record.conflict.decision == Decision::Block {
            return Err(EngineError::GateBlocked {
                plan_id: plan_id.clone(),
                gate: "submission",
                decision: record.conflict.decision,
            });
        }
        record.plan = next;
        Ok(&record.plan)
    }

    /// Approves a pending plan.
    ///
    /// Requires a reviewer identity and a recorded, non-blocking policy
    /// audit. The approved version is preserved for rollback, and the
    /// review lands in the history.
    pub fn approve(
        &mut self,
        plan_id: &PlanId,
        reviewer: impl Into<String>,
        comments: impl Into<String>,
        decided_at: DateTime<Utc>,
    ) -> EngineResult<WorkflowApproval> {
        let reviewer = reviewer.into();
        if reviewer.trim().is_empty() {
            return Err(EngineError::MissingReviewer);
        }
        let record = self.record_mut(plan_id)?;
        let mut next = transition(&record.plan, PlanStatus::Approved, "approve")?;

        let audit = record
            .audit
            .as_ref()
            .ok_or_else(|| EngineError::MissingAudit(plan_id.clone()))?;
        if audit.decision == Decision::Block {
            return Err(EngineError::GateBlocked {
                plan_id: plan_id.clone(),
                gate: "approval",
                decision: audit.decision,
            });
        }
        let rationale = format!(
            "Policy audit decided {} with {} issue(s)",
            audit.decision,
            audit.issue_count()
        );

        next.approval_by = Some(reviewer.clone());
        next.approved_at = Some(decided_at);
        let approval =
            WorkflowApproval::approved(plan_id.clone(), reviewer, comments, rationale, decided_at);

        record.previous_approved = Some(next.clone());
        record.plan = next;
        record.approvals.push(approval.clone());
        Ok(approval)
    }

    /// Rejects a pending plan. The reason is mandatory and is stored on
    /// the plan as well as in the review history.
    pub fn reject(
        &mut self,
        plan_id: &PlanId,
        reviewer: impl Into<String>,
        reason: impl Into<String>,
        decided_at: DateTime<Utc>,
    ) -> EngineResult<WorkflowApproval> {
        let reviewer = reviewer.into();
        if reviewer.trim().is_empty() {
            return Err(EngineError::MissingReviewer);
        }
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(EngineError::EmptyRejectionReason);
        }
        let record = self.record_mut(plan_id)?;
        let mut next = transition(&record.plan, PlanStatus::Rejected, "reject")?;
        next.rejection_reason = Some(reason.clone());

        let approval = WorkflowApproval::rejected(plan_id.clone(), reviewer, reason, decided_at);
        record.plan = next;
        record.approvals.push(approval.clone());
        Ok(approval)
    }

    /// Puts an approved plan into execution. Gated on the latest audit
    /// still being non-blocking, since audits may rerun after approval.
    pub fn activate(&mut self, plan_id: &PlanId) -> EngineResult<&WorkflowPlan> {
        self.gated_transition(plan_id, PlanStatus::Active, "activate", "activation")
    }

    /// Marks an active plan as completed. Completed is terminal.
    pub fn complete(&mut self, plan_id: &PlanId) -> EngineResult<&WorkflowPlan> {
        self.gated_transition(plan_id, PlanStatus::Completed, "complete", "completion")
    }

    /// Rolls a plan back.
    ///
    /// The current version is abandoned: if an approved version was
    /// preserved it becomes current again, otherwise the plan reverts
    /// to a clean draft. Returns the now-current plan.
    pub fn roll_back(&mut self, plan_id: &PlanId) -> EngineResult<&WorkflowPlan> {
        let record = self.record_mut(plan_id)?;
        // Validates the transition; the rolled-back version itself is
        // not kept, the restored one replaces it.
        transition(&record.plan, PlanStatus::RolledBack, "roll back")?;

        record.plan = match record.previous_approved.take() {
            Some(approved) => approved,
            None => {
                let mut draft = record.plan.clone();
                draft.status = PlanStatus::Draft;
                draft.rejection_reason = None;
                draft.approval_by = None;
                draft.approved_at = None;
                draft
            }
        };
        Ok(&record.plan)
    }

    fn gated_transition(
        &mut self,
        plan_id: &PlanId,
        to: PlanStatus,
        action: &'static str,
        gate: &'static str,
    ) -> EngineResult<&WorkflowPlan> {
        let record = self.record_mut(plan_id)?;
        let next = transition(&record.plan, to, action)?;
        if let Some(audit) = &record.audit {
            if audit.decision == Decision::Block {
                return Err(EngineError::GateBlocked {
                    plan_id: plan_id.clone(),
                    gate,
                    decision: audit.decision,
                });
            }
        }
        record.plan = next;
        Ok(&record.plan)
    }

    fn record_mut(&mut self, plan_id: &PlanId) -> EngineResult<&mut PlanRecord> {
        self.plans
            .get_mut(plan_id)
            .ok_or_else(|| EngineError::UnknownPlan(plan_id.clone()))
    }
}
