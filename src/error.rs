//! Engine error types.
//!
//! Structural failures — dependency cycles, unknown plan IDs, disallowed
//! lifecycle transitions — are values returned through [`EngineResult`],
//! never panics. Conflict and audit findings are ordinary data on their
//! result types and do not appear here.

use thiserror::Error;

use crate::ids::{PlanId, TaskId};
use crate::models::{Decision, PlanStatus};

/// A structural failure inside the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The task dependency graph cannot be ordered: it contains a cycle
    /// or a reference to a task that does not exist.
    #[error("task dependency graph has a cycle or unknown reference involving {task_ids:?}")]
    DependencyCycle { task_ids: Vec<TaskId> },

    /// No plan with this ID is registered with the approval manager.
    #[error("unknown plan {0}")]
    UnknownPlan(PlanId),

    /// The requested lifecycle action is not legal from the plan's
    /// current status.
    #[error("plan {plan_id}: cannot {action} while {from}")]
    InvalidTransition {
        plan_id: PlanId,
        from: PlanStatus,
        action: &'static str,
    },

    /// A gating decision forbids the transition (blocked conflict check
    /// on submission, blocked audit on approval/activation/completion).
    #[error("plan {plan_id}: {gate} gate refused the transition (decision: {decision})")]
    GateBlocked {
        plan_id: PlanId,
        gate: &'static str,
        decision: Decision,
    },

    /// Approval and rejection require a reviewer identity.
    #[error("a reviewer identity is required")]
    MissingReviewer,

    /// Rejection requires a non-empty reason.
    #[error("rejection requires a non-empty reason")]
    EmptyRejectionReason,

    /// The plan has no recorded policy audit to gate on.
    #[error("plan {0} has no recorded policy audit")]
    MissingAudit(PlanId),
}

/// Convenience alias used by every fallible engine operation.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_plan() {
        let err = EngineError::UnknownPlan(PlanId::new("plan-9"));
        assert_eq!(err.to_string(), "unknown plan plan-9");

        let err = EngineError::InvalidTransition {
            plan_id: PlanId::new("plan-1"),
            from: PlanStatus::Completed,
            action: "roll back",
        };
        assert_eq!(
            err.to_string(),
            "plan plan-1: cannot roll back while completed"
        );
    }

    #[test]
    fn test_gate_blocked_message() {
        let err = EngineError::GateBlocked {
            plan_id: PlanId::new("plan-2"),
            gate: "conflict",
            decision: Decision::Block,
        };
        assert_eq!(
            err.to_string(),
            "plan plan-2: conflict gate refused the transition (decision: block)"
        );
    }
}
