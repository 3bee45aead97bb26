//! Workflow scheduling and conflict-audit engine for batch mushroom
//! cultivation.
//!
//! Turns a production request (facilities, species lines, constraints,
//! planning window) into an executable, audited, approval-gated plan.
//! The pipeline is a fixed sequence of independent components:
//!
//! request → tasks → schedule proposal → conflict check → plan →
//! policy audit → approval lifecycle
//!
//! # Modules
//!
//! - **`models`**: Domain types — `WorkflowRequest`, `WorkflowTask`,
//!   `ScheduleProposal`, `WorkflowConflict`, `WorkflowPlan`,
//!   `WorkflowAuditResult`, plus the species/substrate/template catalogs
//! - **`generator`**: Expands a request into dependency-chained tasks
//! - **`builder`**: Places tasks on the timeline (deterministic
//!   topological order, confidence scoring)
//! - **`conflict`**: Pluggable conflict detectors and the auditor that
//!   composes them into a gate decision
//! - **`assembler`**: Groups a checked proposal into a reviewable plan
//!   with yield, cost and tradeoff estimates
//! - **`policy`**: Timeline, substrate, facility and labor audits, with
//!   regression detection against the last approved version
//! - **`approval`**: Plan lifecycle state machine and the gated ledger
//! - **`engine`**: Facade wiring everything together, one audit log
//!   entry per state-changing operation
//! - **`log`**: The audit log boundary (`AuditSink`) and entry types
//! - **`ids`**: Typed identifiers and the injectable ID generator
//! - **`error`**: Crate-wide error type
//!
//! # Decisions
//!
//! Conflicts and audit findings roll up into a three-level gate —
//! `Allow < Warn < Block`. Warnings surface but never stop a plan;
//! any critical finding blocks the lifecycle transition it gates.
//!
//! # Determinism
//!
//! Clocks and ID generation are injected. With a fixed ID generator and
//! fixed timestamps, every component is a pure function of its inputs.

pub mod approval;
pub mod assembler;
pub mod builder;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod generator;
pub mod ids;
pub mod log;
pub mod models;
pub mod policy;

pub use approval::ApprovalManager;
pub use assembler::PlanAssembler;
pub use builder::{ResourceAvailability, ScheduleBuilder};
pub use conflict::{AuditThresholds, ConflictAuditor};
pub use engine::WorkflowEngine;
pub use error::{EngineError, EngineResult};
pub use generator::TaskGenerator;
pub use ids::{IdGenerator, LogEntryId, PlanId, ProposalId, SequentialIdGenerator, TaskId, UuidGenerator};
pub use log::{AuditSink, MemoryAuditLog, WorkflowLogEntry};
pub use policy::PolicyAuditor;
