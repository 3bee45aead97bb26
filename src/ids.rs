//! Identifier newtypes and generation.
//!
//! Every entity the engine creates (task, proposal, plan, log entry)
//! carries its own ID type, so a plan ID can never be passed where a task
//! ID belongs. Generation goes through the injected [`IdGenerator`]:
//! [`UuidGenerator`] for production, [`SequentialIdGenerator`] for
//! deterministic tests and replays.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Source of fresh identifiers.
///
/// Implementations must be safe to share across threads; the engine holds
/// one generator behind an `Arc` and every component draws from it.
pub trait IdGenerator: Send + Sync + fmt::Debug {
    /// Returns a fresh identifier starting with `prefix`.
    fn fresh(&self, prefix: &str) -> String;
}

/// UUIDv4-backed generator. Collision-free across processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn fresh(&self, prefix: &str) -> String {
        format!("{prefix}-{}", Uuid::new_v4())
    }
}

/// Atomic-counter generator: `task-1`, `task-2`, ...
///
/// Deterministic within a process, so tests can assert on exact IDs.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    /// Creates a generator counting from 1.
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn fresh(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{n}")
    }
}

/// Identifier of a [`WorkflowTask`](crate::models::WorkflowTask).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Draws a fresh `task-*` identifier.
    pub fn generate(ids: &dyn IdGenerator) -> Self {
        Self(ids.fresh("task"))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a [`ScheduleProposal`](crate::models::ScheduleProposal).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(String);

impl ProposalId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Draws a fresh `proposal-*` identifier.
    pub fn generate(ids: &dyn IdGenerator) -> Self {
        Self(ids.fresh("proposal"))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a [`WorkflowPlan`](crate::models::WorkflowPlan).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

impl PlanId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Draws a fresh `plan-*` identifier.
    pub fn generate(ids: &dyn IdGenerator) -> Self {
        Self(ids.fresh("plan"))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a [`WorkflowLogEntry`](crate::log::WorkflowLogEntry).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogEntryId(String);

impl LogEntryId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Draws a fresh `log-*` identifier.
    pub fn generate(ids: &dyn IdGenerator) -> Self {
        Self(ids.fresh("log"))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_generator_counts_up() {
        let ids = SequentialIdGenerator::new();
        assert_eq!(ids.fresh("task"), "task-1");
        assert_eq!(ids.fresh("task"), "task-2");
        assert_eq!(ids.fresh("plan"), "plan-3");
    }

    #[test]
    fn test_uuid_generator_unique() {
        let ids = UuidGenerator;
        let a = ids.fresh("plan");
        let b = ids.fresh("plan");
        assert_ne!(a, b);
        assert!(a.starts_with("plan-"));
    }

    #[test]
    fn test_typed_ids_display_and_generate() {
        let ids = SequentialIdGenerator::new();
        let task = TaskId::generate(&ids);
        assert_eq!(task.to_string(), "task-1");
        assert_eq!(task.as_str(), "task-1");

        let plan = PlanId::new("plan-x");
        assert_eq!(plan.to_string(), "plan-x");
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = TaskId::new("task-7");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"task-7\"");
        let back: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
