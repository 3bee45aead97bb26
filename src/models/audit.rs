//! Policy audit result model.
//!
//! The policy auditor runs four independent structural checks over a
//! plan; each produces an [`AuditCheck`] with zero or more issues, and
//! the result folds them into one gate decision. Audit findings are
//! data, never errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{PlanId, TaskId};

use super::{Decision, Severity, WorkflowPlan};

/// A single issue raised by a policy check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditIssue {
    pub severity: Severity,
    /// Tasks the issue points at, in detection order.
    pub task_ids: Vec<TaskId>,
    pub message: String,
}

impl AuditIssue {
    /// A critical issue: blocks the plan on its own.
    pub fn critical(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Critical,
            task_ids: Vec::new(),
            message: message.into(),
        }
    }

    /// A warning issue: the plan may proceed with a caveat.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            task_ids: Vec::new(),
            message: message.into(),
        }
    }

    /// Attaches the tasks the issue points at.
    pub fn with_tasks(mut self, task_ids: Vec<TaskId>) -> Self {
        self.task_ids = task_ids;
        self
    }
}

/// Outcome of one named policy check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditCheck {
    /// Check name: `timeline`, `substrate`, `facility` or `labor`.
    pub name: String,
    /// True when the check raised no issues.
    pub passed: bool,
    /// Issues in detection order.
    pub issues: Vec<AuditIssue>,
}

impl AuditCheck {
    /// Builds a check outcome; `passed` is derived from the issue list.
    pub fn from_issues(name: impl Into<String>, issues: Vec<AuditIssue>) -> Self {
        Self {
            name: name.into(),
            passed: issues.is_empty(),
            issues,
        }
    }

    /// Worst severity among the issues, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity).max()
    }
}

/// Aggregate structural audit of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowAuditResult {
    /// Plan the audit applies to.
    pub plan_id: PlanId,
    /// Species lifecycle ordering and stage durations.
    pub timeline: AuditCheck,
    /// Sterilization and cooling minimums.
    pub substrate: AuditCheck,
    /// Room capacity, temperature bounds, equipment references.
    pub facility: AuditCheck,
    /// Daily labor versus the declared ceiling.
    pub labor: AuditCheck,
    /// Whether any metric regressed against the prior approved plan.
    pub regression_detected: bool,
    /// Escalated gate decision.
    pub decision: Decision,
    /// One canned remediation per failed check.
    pub recommendations: Vec<String>,
    /// Suggested remediation steps; populated only on a block.
    pub rollback_steps: Vec<String>,
    /// When the audit ran.
    pub audited_at: DateTime<Utc>,
}

impl WorkflowAuditResult {
    /// The four checks in declaration order.
    pub fn checks(&self) -> [&AuditCheck; 4] {
        [&self.timeline, &self.substrate, &self.facility, &self.labor]
    }

    /// Whether the decision blocks downstream transitions.
    pub fn is_blocked(&self) -> bool {
        self.decision == Decision::Block
    }

    /// Every issue across the four checks.
    pub fn issue_count(&self) -> usize {
        self.checks().iter().map(|c| c.issues.len()).sum()
    }
}

/// Metrics snapshot of an approved plan, used for regression detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanBaseline {
    pub confidence: f64,
    pub total_labor_hours: f64,
    pub estimated_yield_kg: f64,
}

impl PlanBaseline {
    /// Snapshots the metrics of a plan.
    pub fn from_plan(plan: &WorkflowPlan) -> Self {
        Self {
            confidence: plan.confidence,
            total_labor_hours: plan.proposal.total_labor_hours,
            estimated_yield_kg: plan.estimated_yield_kg(),
        }
    }

    /// Whether `candidate` compares unfavorably on any metric.
    /// Equal metrics are not a regression.
    pub fn regressed_by(&self, candidate: &PlanBaseline) -> bool {
        candidate.confidence < self.confidence
            || candidate.total_labor_hours > self.total_labor_hours
            || candidate.estimated_yield_kg < self.estimated_yield_kg
    }
}
