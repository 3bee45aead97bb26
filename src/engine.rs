//! Engine facade.
//!
//! [`WorkflowEngine`] wires the whole pipeline behind one type: request
//! → tasks → proposal → conflict check → plan → policy audit → approval
//! lifecycle. Every state-changing operation records exactly one
//! [`WorkflowLogEntry`] on the injected [`AuditSink`], whether it
//! succeeds or fails; read-only queries record nothing.
//!
//! The facade owns no algorithm. Components stay independently usable —
//! the engine only sequences them, stamps timestamps, and keeps the log
//! accounting honest.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use mycoplan::engine::WorkflowEngine;
//! use mycoplan::ids::SequentialIdGenerator;
//! use mycoplan::log::MemoryAuditLog;
//! use mycoplan::models::{DateRange, SpeciesPlan, WorkflowRequest};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let log = Arc::new(MemoryAuditLog::new());
//! let mut engine = WorkflowEngine::new(
//!     Arc::new(SequentialIdGenerator::new()),
//!     log.clone(),
//! );
//!
//! let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
//! let request = WorkflowRequest::new("req-1", DateRange::new(start, start + Duration::days(30)))
//!     .with_facility("north")
//!     .with_species_plan(SpeciesPlan::new("oyster", "room-1"));
//!
//! let plan = engine.plan_request(&request);
//! assert_eq!(log.len(), 4); // generation, proposal, check, plan creation
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::approval::ApprovalManager;
use crate::assembler::PlanAssembler;
use crate::builder::{ResourceAvailability, ScheduleBuilder};
use crate::conflict::ConflictAuditor;
use crate::error::{EngineError, EngineResult};
use crate::generator::TaskGenerator;
use crate::ids::{IdGenerator, LogEntryId, PlanId, ProposalId};
use crate::log::{AuditSink, LogCategory, LogContext, LogPayload, WorkflowLogEntry};
use crate::models::{
    ConflictCheckResult, Decision, ScheduleProposal, WorkflowApproval, WorkflowAuditResult,
    WorkflowPlan, WorkflowRequest, WorkflowTask,
};
use crate::policy::PolicyAuditor;

/// The assembled scheduling and audit engine.
pub struct WorkflowEngine {
    ids: Arc<dyn IdGenerator>,
    sink: Arc<dyn AuditSink>,
    generator: TaskGenerator,
    builder: ScheduleBuilder,
    conflicts: ConflictAuditor,
    assembler: PlanAssembler,
    policy: PolicyAuditor,
    approvals: ApprovalManager,
}

impl WorkflowEngine {
    /// Creates an engine with default components, drawing IDs from
    /// `ids` and recording audit entries on `sink`.
    pub fn new(ids: Arc<dyn IdGenerator>, sink: Arc<dyn AuditSink>) -> Self {
        Self {
            generator: TaskGenerator::new(Arc::clone(&ids)),
            builder: ScheduleBuilder::new(Arc::clone(&ids)),
            conflicts: ConflictAuditor::new(),
            assembler: PlanAssembler::new(Arc::clone(&ids)),
            policy: PolicyAuditor::new(),
            approvals: ApprovalManager::new(),
            ids,
            sink,
        }
    }

    /// Replaces the task generator.
    pub fn with_generator(mut self, generator: TaskGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Replaces the conflict auditor.
    pub fn with_conflict_auditor(mut self, conflicts: ConflictAuditor) -> Self {
        self.conflicts = conflicts;
        self
    }

    /// Replaces the plan assembler.
    pub fn with_assembler(mut self, assembler: PlanAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Replaces the policy auditor.
    pub fn with_policy_auditor(mut self, policy: PolicyAuditor) -> Self {
        self.policy = policy;
        self
    }

    /// Expands a request into workflow tasks.
    ///
    /// A request with no species plans and no facilities yields an empty
    /// list and a failure log entry — not an error, per the contract
    /// that invalid input produces an empty result collection.
    pub fn generate_tasks(&self, request: &WorkflowRequest) -> Vec<WorkflowTask> {
        if request.is_empty() {
            warn!(request_id = %request.id, "request names no species plans and no facilities");
            self.sink.record(WorkflowLogEntry::failure(
                self.entry_id(),
                Utc::now(),
                LogCategory::TaskGeneration,
                request_context(request),
                format!(
                    "Request {} names no species plans and no facilities",
                    request.id
                ),
            ));
            return Vec::new();
        }

        let tasks = self.generator.generate(request);
        let mut species: Vec<String> = request
            .species_plans
            .iter()
            .map(|plan| plan.species.clone())
            .collect();
        species.sort();
        species.dedup();

        info!(request_id = %request.id, task_count = tasks.len(), "generated workflow tasks");
        self.sink.record(WorkflowLogEntry::success(
            self.entry_id(),
            Utc::now(),
            LogCategory::TaskGeneration,
            request_context(request),
            LogPayload::TaskGeneration {
                task_count: tasks.len(),
                species,
            },
            format!("Generated {} task(s) for request {}", tasks.len(), request.id),
        ));
        tasks
    }

    /// Builds a schedule proposal for the tasks, against the request's
    /// window, labor ceiling and declared equipment.
    pub fn propose_schedule(
        &self,
        tasks: &[WorkflowTask],
        request: &WorkflowRequest,
    ) -> EngineResult<ScheduleProposal> {
        let availability = ResourceAvailability::from_request(request);
        match self.builder.build(tasks, &availability) {
            Ok(proposal) => {
                info!(
                    request_id = %request.id,
                    proposal_id = %proposal.id,
                    confidence = proposal.confidence,
                    "proposed schedule"
                );
                self.sink.record(WorkflowLogEntry::success(
                    self.entry_id(),
                    Utc::now(),
                    LogCategory::ScheduleProposal,
                    request_context(request).with_proposal(proposal.id.clone()),
                    LogPayload::ScheduleProposal {
                        task_count: proposal.task_count(),
                        confidence: proposal.confidence,
                        risk_factor_count: proposal.risk_factors.len(),
                    },
                    format!(
                        "Proposed schedule {} covering {} task(s)",
                        proposal.id,
                        proposal.task_count()
                    ),
                ));
                Ok(proposal)
            }
            Err(err) => {
                self.record_failure(LogCategory::ScheduleProposal, request_context(request), &err);
                Err(err)
            }
        }
    }

    /// Runs the conflict auditor over a proposal.
    ///
    /// `tasks` is the requested workload; passing the raw tasks with an
    /// empty proposal is the documented recovery after a dependency
    /// cycle, and reports every unplaced dependency as a blocking
    /// conflict.
    pub fn check_conflicts(
        &self,
        proposal: &ScheduleProposal,
        tasks: &[WorkflowTask],
        request: &WorkflowRequest,
    ) -> ConflictCheckResult {
        let result = self.conflicts.check_conflicts(&proposal.tasks, tasks, request);
        let context = request_context(request).with_proposal(proposal.id.clone());
        let payload = LogPayload::ConflictCheck {
            conflict_count: result.conflicts.len(),
            decision: result.decision,
        };
        let entry = if result.decision == Decision::Allow {
            WorkflowLogEntry::success(
                self.entry_id(),
                Utc::now(),
                LogCategory::ConflictCheck,
                context,
                payload,
                result.rationale.clone(),
            )
        } else {
            WorkflowLogEntry::warning(
                self.entry_id(),
                Utc::now(),
                LogCategory::ConflictCheck,
                context,
                payload,
                result.rationale.clone(),
            )
        };
        self.sink.record(entry);
        result
    }

    /// Assembles a draft plan from a checked proposal and registers it
    /// with the approval ledger together with its conflict gate.
    pub fn create_plan(
        &mut self,
        request: &WorkflowRequest,
        proposal: ScheduleProposal,
        conflicts: &ConflictCheckResult,
    ) -> WorkflowPlan {
        let plan = self
            .assembler
            .assemble(request, proposal, conflicts, Utc::now());
        self.approvals.register(plan.clone(), conflicts.clone());

        info!(plan_id = %plan.id, confidence = plan.confidence, "created draft plan");
        self.sink.record(WorkflowLogEntry::success(
            self.entry_id(),
            Utc::now(),
            LogCategory::PlanCreation,
            request_context(request)
                .with_plan(plan.id.clone())
                .with_proposal(plan.proposal.id.clone()),
            LogPayload::PlanCreation {
                group_count: plan.groups.len(),
                confidence: plan.confidence,
            },
            format!("Created draft plan {} from proposal {}", plan.id, plan.proposal.id),
        ));
        plan
    }

    /// The full planning pipeline in one call: generate, schedule,
    /// check, assemble. Records one entry per stage. When scheduling
    /// fails structurally, the conflict check runs over the raw tasks
    /// against an empty proposal, so the resulting draft plan carries a
    /// blocking conflict gate and cannot be submitted.
    pub fn plan_request(&mut self, request: &WorkflowRequest) -> WorkflowPlan {
        let tasks = self.generate_tasks(request);
        let proposal = match self.propose_schedule(&tasks, request) {
            Ok(proposal) => proposal,
            Err(_) => ScheduleProposal::empty(
                ProposalId::generate(&*self.ids),
                "Scheduling failed structurally; see the conflict check",
            ),
        };
        let conflicts = self.check_conflicts(&proposal, &tasks, request);
        self.create_plan(request, proposal, &conflicts)
    }

    /// Runs the policy audit on a registered plan and records the
    /// result on its ledger entry, so lifecycle gates see it.
    pub fn run_policy_audit(
        &mut self,
        plan_id: &PlanId,
        request: &WorkflowRequest,
    ) -> EngineResult<WorkflowAuditResult> {
        let context = request_context(request).with_plan(plan_id.clone());
        let audit = {
            let plan = match self.approvals.plan(plan_id) {
                Ok(plan) => plan,
                Err(err) => {
                    self.record_failure(LogCategory::PolicyAudit, context, &err);
                    return Err(err);
                }
            };
            // The plan exists, so the baseline lookup cannot fail.
            let baseline = self.approvals.baseline(plan_id).ok().flatten();
            self.policy.run_audit(plan, request, baseline.as_ref())
        };
        if let Err(err) = self.approvals.record_audit(plan_id, audit.clone()) {
            self.record_failure(LogCategory::PolicyAudit, context, &err);
            return Err(err);
        }

        let payload = LogPayload::PolicyAudit {
            decision: audit.decision,
            issue_count: audit.issue_count(),
            regression_detected: audit.regression_detected,
        };
        let message = format!(
            "Policy audit of plan {plan_id} decided {} with {} issue(s)",
            audit.decision,
            audit.issue_count()
        );
        let entry = if audit.decision == Decision::Allow {
            WorkflowLogEntry::success(
                self.entry_id(),
                Utc::now(),
                LogCategory::PolicyAudit,
                context,
                payload,
                message,
            )
        } else {
            WorkflowLogEntry::warning(
                self.entry_id(),
                Utc::now(),
                LogCategory::PolicyAudit,
                context,
                payload,
                message,
            )
        };
        self.sink.record(entry);
        Ok(audit)
    }

    /// Submits a draft plan for review. Refused while its conflict
    /// check blocks.
    pub fn submit(&mut self, plan_id: &PlanId) -> EngineResult<WorkflowPlan> {
        self.lifecycle(plan_id, LogCategory::Submission, "submitted for review", |a, id| {
            a.submit(id).map(WorkflowPlan::clone)
        })
    }

    /// Approves a pending plan on behalf of `reviewer`.
    pub fn approve(
        &mut self,
        plan_id: &PlanId,
        reviewer: &str,
        comments: &str,
    ) -> EngineResult<WorkflowApproval> {
        let context = LogContext::new()
            .with_plan(plan_id.clone())
            .with_user(reviewer);
        match self.approvals.approve(plan_id, reviewer, comments, Utc::now()) {
            Ok(approval) => {
                info!(plan_id = %plan_id, reviewer, "plan approved");
                self.sink.record(WorkflowLogEntry::success(
                    self.entry_id(),
                    Utc::now(),
                    LogCategory::Approval,
                    context,
                    LogPayload::Approval {
                        reviewer: reviewer.to_string(),
                    },
                    format!("Plan {plan_id} approved by {reviewer}"),
                ));
                Ok(approval)
            }
            Err(err) => {
                self.record_failure(LogCategory::Approval, context, &err);
                Err(err)
            }
        }
    }

    /// Rejects a pending plan with a mandatory reason.
    pub fn reject(
        &mut self,
        plan_id: &PlanId,
        reviewer: &str,
        reason: &str,
    ) -> EngineResult<WorkflowApproval> {
        let context = LogContext::new()
            .with_plan(plan_id.clone())
            .with_user(reviewer);
        match self.approvals.reject(plan_id, reviewer, reason, Utc::now()) {
            Ok(approval) => {
                info!(plan_id = %plan_id, reviewer, reason, "plan rejected");
                self.sink.record(WorkflowLogEntry::success(
                    self.entry_id(),
                    Utc::now(),
                    LogCategory::Rejection,
                    context,
                    LogPayload::Rejection {
                        reviewer: reviewer.to_string(),
                        reason: reason.to_string(),
                    },
                    format!("Plan {plan_id} rejected by {reviewer}: {reason}"),
                ));
                Ok(approval)
            }
            Err(err) => {
                self.record_failure(LogCategory::Rejection, context, &err);
                Err(err)
            }
        }
    }

    /// Hands an approved plan over to execution.
    pub fn activate(&mut self, plan_id: &PlanId) -> EngineResult<WorkflowPlan> {
        self.lifecycle(plan_id, LogCategory::Activation, "activated", |a, id| {
            a.activate(id).map(WorkflowPlan::clone)
        })
    }

    /// Marks an active plan as completed.
    pub fn complete(&mut self, plan_id: &PlanId) -> EngineResult<WorkflowPlan> {
        self.lifecycle(plan_id, LogCategory::Completion, "completed", |a, id| {
            a.complete(id).map(WorkflowPlan::clone)
        })
    }

    /// Rolls a plan back, restoring the previously approved version or
    /// reverting to draft. Returns the now-current plan.
    pub fn roll_back(&mut self, plan_id: &PlanId) -> EngineResult<WorkflowPlan> {
        let context = LogContext::new().with_plan(plan_id.clone());
        let had_prior = match self.approvals.record(plan_id) {
            Ok(record) => record.previous_approved.is_some(),
            Err(err) => {
                self.record_failure(LogCategory::Rollback, context, &err);
                return Err(err);
            }
        };
        match self.approvals.roll_back(plan_id).map(WorkflowPlan::clone) {
            Ok(plan) => {
                info!(plan_id = %plan_id, restored = had_prior, "plan rolled back");
                self.sink.record(WorkflowLogEntry::success(
                    self.entry_id(),
                    Utc::now(),
                    LogCategory::Rollback,
                    context,
                    LogPayload::Rollback {
                        restored: had_prior.then(|| plan_id.clone()),
                        reverted_to_draft: !had_prior,
                    },
                    format!("Plan {plan_id} rolled back"),
                ));
                Ok(plan)
            }
            Err(err) => {
                self.record_failure(LogCategory::Rollback, context, &err);
                Err(err)
            }
        }
    }

    /// The current version of a plan. Read-only; records no log entry.
    pub fn plan(&self, plan_id: &PlanId) -> EngineResult<&WorkflowPlan> {
        self.approvals.plan(plan_id)
    }

    /// The approval ledger, for richer read-only queries.
    pub fn approvals(&self) -> &ApprovalManager {
        &self.approvals
    }

    fn lifecycle(
        &mut self,
        plan_id: &PlanId,
        category: LogCategory,
        verb: &str,
        op: impl FnOnce(&mut ApprovalManager, &PlanId) -> EngineResult<WorkflowPlan>,
    ) -> EngineResult<WorkflowPlan> {
        let context = LogContext::new().with_plan(plan_id.clone());
        let from = match self.approvals.plan(plan_id) {
            Ok(plan) => plan.status,
            Err(err) => {
                self.record_failure(category, context, &err);
                return Err(err);
            }
        };
        match op(&mut self.approvals, plan_id) {
            Ok(plan) => {
                info!(plan_id = %plan_id, from = %from, to = %plan.status, "plan {verb}");
                self.sink.record(WorkflowLogEntry::success(
                    self.entry_id(),
                    Utc::now(),
                    category,
                    context,
                    LogPayload::Lifecycle {
                        from,
                        to: plan.status,
                    },
                    format!("Plan {plan_id} {verb}"),
                ));
                Ok(plan)
            }
            Err(err) => {
                self.record_failure(category, context, &err);
                Err(err)
            }
        }
    }

    fn record_failure(&self, category: LogCategory, context: LogContext, err: &EngineError) {
        warn!(category = %category, %err, "engine operation failed");
        self.sink.record(WorkflowLogEntry::failure(
            self.entry_id(),
            Utc::now(),
            category,
            context,
            err.to_string(),
        ));
    }

    fn entry_id(&self) -> LogEntryId {
        LogEntryId::generate(&*self.ids)
    }
}

fn request_context(request: &WorkflowRequest) -> LogContext {
    let mut context = LogContext::new().with_request(request.id.as_str());
    if let Some(facility) = request.facility_ids.first() {
        context = context.with_facility(facility.as_str());
    }
    context
}
