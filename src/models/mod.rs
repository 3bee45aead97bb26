//! Cultivation workflow domain models.
//!
//! Core data types for requests, tasks, schedules, conflicts, plans and
//! audits. Everything here is a plain serializable value: components
//! that operate on these types (generator, builder, auditors, approval
//! manager) live in their own modules and never reach back into model
//! internals.
//!
//! # Pipeline Mapping
//!
//! | Type | Produced by | Consumed by |
//! |------|-------------|-------------|
//! | `WorkflowRequest` | caller | TaskGenerator |
//! | `WorkflowTask` | TaskGenerator | ScheduleBuilder, ConflictAuditor |
//! | `ScheduleProposal` | ScheduleBuilder | ConflictAuditor, PlanAssembler |
//! | `ConflictCheckResult` | ConflictAuditor | PlanAssembler, ApprovalManager |
//! | `WorkflowPlan` | PlanAssembler | PolicyAuditor, ApprovalManager |
//! | `WorkflowAuditResult` | PolicyAuditor | ApprovalManager |

mod audit;
mod conflict;
mod plan;
mod profiles;
mod request;
mod schedule;
mod task;

pub use audit::{AuditCheck, AuditIssue, PlanBaseline, WorkflowAuditResult};
pub use conflict::{
    ConflictCheckResult, ConflictType, Decision, Severity, WorkflowConflict,
    NO_CONFLICTS_RATIONALE,
};
pub use plan::{
    ApprovalDecision, PlanStatus, SubWorkflow, Tradeoff, TradeoffDimension, WorkflowApproval,
    WorkflowPlan,
};
pub use profiles::{
    SpeciesCatalog, SpeciesProfile, SubstrateCatalog, SubstrateProfile, TaskTemplate,
    TaskTemplates,
};
pub use request::{ConstraintSet, SpeciesPlan, TemperatureBounds, WeightingFlags, WorkflowRequest};
pub use schedule::{DateRange, ScheduledTask, ScheduleProposal};
pub use task::{LifecycleStage, TaskPriority, TaskType, WorkflowTask};
