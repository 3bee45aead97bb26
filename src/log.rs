//! Workflow audit log boundary.
//!
//! Every state-changing engine operation emits exactly one immutable
//! [`WorkflowLogEntry`] to the injected [`AuditSink`]; read-only queries
//! emit none. Durable storage is the embedder's concern — the crate
//! ships [`MemoryAuditLog`] for tests and light embeddings.
//!
//! Payloads are a closed tagged union: an entry can always be matched
//! exhaustively, and nothing free-form rides along.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

use crate::ids::{LogEntryId, PlanId, ProposalId};
use crate::models::{Decision, PlanStatus};

/// Operation category of a log entry, one per state-changing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogCategory {
    TaskGeneration,
    ScheduleProposal,
    ConflictCheck,
    PlanCreation,
    PolicyAudit,
    Submission,
    Approval,
    Rejection,
    Activation,
    Completion,
    Rollback,
}

impl LogCategory {
    /// Kebab-case tag.
    pub fn tag(&self) -> &'static str {
        match self {
            LogCategory::TaskGeneration => "task-generation",
            LogCategory::ScheduleProposal => "schedule-proposal",
            LogCategory::ConflictCheck => "conflict-check",
            LogCategory::PlanCreation => "plan-creation",
            LogCategory::PolicyAudit => "policy-audit",
            LogCategory::Submission => "submission",
            LogCategory::Approval => "approval",
            LogCategory::Rejection => "rejection",
            LogCategory::Activation => "activation",
            LogCategory::Completion => "completion",
            LogCategory::Rollback => "rollback",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Outcome of the logged operation.
///
/// `Warning` marks an operation that completed but whose decision was
/// not a clean allow, so downstream readers can filter for attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogStatus {
    Success,
    Warning,
    Failure,
}

/// Identifiers tying an entry to its subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogContext {
    pub plan_id: Option<PlanId>,
    pub proposal_id: Option<ProposalId>,
    pub request_id: Option<String>,
    pub user_id: Option<String>,
    pub facility_id: Option<String>,
}

impl LogContext {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ties the entry to a plan.
    pub fn with_plan(mut self, plan_id: PlanId) -> Self {
        self.plan_id = Some(plan_id);
        self
    }

    /// Ties the entry to a proposal.
    pub fn with_proposal(mut self, proposal_id: ProposalId) -> Self {
        self.proposal_id = Some(proposal_id);
        self
    }

    /// Ties the entry to the originating request.
    pub fn with_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Ties the entry to the acting user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Ties the entry to a facility.
    pub fn with_facility(mut self, facility_id: impl Into<String>) -> Self {
        self.facility_id = Some(facility_id.into());
        self
    }
}

/// Category-specific payload. Closed tagged union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LogPayload {
    TaskGeneration {
        task_count: usize,
        species: Vec<String>,
    },
    ScheduleProposal {
        task_count: usize,
        confidence: f64,
        risk_factor_count: usize,
    },
    ConflictCheck {
        conflict_count: usize,
        decision: Decision,
    },
    PlanCreation {
        group_count: usize,
        confidence: f64,
    },
    PolicyAudit {
        decision: Decision,
        issue_count: usize,
        regression_detected: bool,
    },
    /// Submission, activation and completion transitions.
    Lifecycle {
        from: PlanStatus,
        to: PlanStatus,
    },
    Approval {
        reviewer: String,
    },
    Rejection {
        reviewer: String,
        reason: String,
    },
    Rollback {
        /// Plan restored by the rollback, when one existed.
        restored: Option<PlanId>,
        /// True when no prior approved plan existed and the plan
        /// reverted to draft.
        reverted_to_draft: bool,
    },
    /// Structural failure of the attempted operation.
    Failure {
        error: String,
    },
}

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowLogEntry {
    pub id: LogEntryId,
    pub timestamp: DateTime<Utc>,
    pub category: LogCategory,
    pub status: LogStatus,
    pub context: LogContext,
    pub payload: LogPayload,
    pub message: String,
}

impl WorkflowLogEntry {
    /// A success entry.
    pub fn success(
        id: LogEntryId,
        timestamp: DateTime<Utc>,
        category: LogCategory,
        context: LogContext,
        payload: LogPayload,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id,
            timestamp,
            category,
            status: LogStatus::Success,
            context,
            payload,
            message: message.into(),
        }
    }

    /// A success entry carrying a warning status: the operation went
    /// through, but its decision was not a clean allow.
    pub fn warning(
        id: LogEntryId,
        timestamp: DateTime<Utc>,
        category: LogCategory,
        context: LogContext,
        payload: LogPayload,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id,
            timestamp,
            category,
            status: LogStatus::Warning,
            context,
            payload,
            message: message.into(),
        }
    }

    /// A failure entry; the error text doubles as the message.
    pub fn failure(
        id: LogEntryId,
        timestamp: DateTime<Utc>,
        category: LogCategory,
        context: LogContext,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        Self {
            id,
            timestamp,
            category,
            status: LogStatus::Failure,
            context,
            payload: LogPayload::Failure {
                error: error.clone(),
            },
            message: error,
        }
    }
}

/// Receives every audit entry the engine emits.
///
/// Implementations forward entries to durable storage. Recording is
/// fire-and-forget: a sink must not fail the operation that produced
/// the entry. Must be thread-safe; the engine shares one sink.
pub trait AuditSink: Send + Sync {
    /// Records one immutable entry.
    fn record(&self, entry: WorkflowLogEntry);
}

/// In-memory sink for tests and light embeddings.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<WorkflowLogEntry>>,
}

impl MemoryAuditLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<T>(&self, f: impl FnOnce(&Vec<WorkflowLogEntry>) -> T) -> T {
        // Poisoning only means a writer panicked mid-push; the data is
        // still a valid Vec, so recover instead of propagating.
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        f(&entries)
    }

    /// Snapshot of every entry, in emission order.
    pub fn entries(&self) -> Vec<WorkflowLogEntry> {
        self.with_entries(|e| e.clone())
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.with_entries(|e| e.len())
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries of one category, in emission order.
    pub fn by_category(&self, category: LogCategory) -> Vec<WorkflowLogEntry> {
        self.with_entries(|e| {
            e.iter()
                .filter(|entry| entry.category == category)
                .cloned()
                .collect()
        })
    }

    /// Failure entries, in emission order.
    pub fn failures(&self) -> Vec<WorkflowLogEntry> {
        self.with_entries(|e| {
            e.iter()
                .filter(|entry| entry.status == LogStatus::Failure)
                .cloned()
                .collect()
        })
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<WorkflowLogEntry> {
        self.with_entries(|e| e.last().cloned())
    }
}

impl AuditSink for MemoryAuditLog {
    fn record(&self, entry: WorkflowLogEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(entry);
    }
}
