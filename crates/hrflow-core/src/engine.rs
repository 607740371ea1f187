//! The approval workflow state machine
//!
//! The engine is the only writer of a request's stage, status and history.
//! Every operation is a single synchronous unit of work against the
//! request store: validate, transition, append the audit entry - all under
//! the store's per-request lock, so racing reviewers serialize to exactly
//! one winner.

use crate::stages::StageTable;
use crate::store::RequestStore;
use hrflow_types::{
    EmployeeId, Request, RequestId, RequestStatus, RequestSubmission, Result, WorkflowError,
};
use std::sync::Arc;

pub struct WorkflowEngine {
    stages: StageTable,
    store: Arc<dyn RequestStore>,
}

impl WorkflowEngine {
    pub fn new(stages: StageTable, store: Arc<dyn RequestStore>) -> Self {
        Self { stages, store }
    }

    pub fn stages(&self) -> &StageTable {
        &self.stages
    }

    /// Create a new request at the first reviewer stage.
    ///
    /// The submitter identity is trusted - authentication happens before
    /// the engine. Only presence of the display fields is checked here;
    /// content validation (date ordering, amounts) is the caller's
    /// concern and happens before `submit` is invoked.
    pub fn submit(&self, submission: RequestSubmission) -> Result<Request> {
        if submission.employee_id.as_str().trim().is_empty() {
            return Err(WorkflowError::InvalidArgument(
                "employee id is required".to_string(),
            ));
        }
        if submission.employee_name.trim().is_empty() {
            return Err(WorkflowError::InvalidArgument(
                "employee name is required".to_string(),
            ));
        }
        if submission.title.trim().is_empty() {
            return Err(WorkflowError::InvalidArgument(
                "request title is required".to_string(),
            ));
        }

        let request = Request::new(submission, self.stages.first_review_stage());
        let request = self.store.create(request)?;

        log::info!(
            "Submitted {} request {} by employee {} at stage {}",
            request.request_type,
            request.id,
            request.employee_id,
            request.stage
        );
        Ok(request)
    }

    /// Advance a pending request one stage. Only the role the stage table
    /// assigns to the request's current stage may approve; anyone else
    /// gets an explicit `Unauthorized` with no mutation.
    pub fn approve(&self, id: &RequestId, actor_role: &str) -> Result<Request> {
        let stages = &self.stages;

        let updated = self.store.update(id, &mut |request| {
            Self::check_actionable(stages, request, actor_role)?;

            let next = stages.successor(request.stage).ok_or_else(|| {
                WorkflowError::Config(format!("stage {} has no successor", request.stage))
            })?;
            let status = if next == stages.terminal_stage() {
                RequestStatus::Approved
            } else {
                RequestStatus::Pending
            };

            request.advance(actor_role, next, status);
            Ok(())
        })?;

        log::info!(
            "Request {} approved by {} -> stage {} ({:?})",
            updated.id,
            actor_role,
            updated.stage,
            updated.status
        );
        Ok(updated)
    }

    /// Halt a pending request. Rejection authority is scoped to the same
    /// reviewer who could have approved, and the reason is mandatory.
    /// Terminal: every later approve/reject returns `AlreadyFinalized`.
    pub fn reject(&self, id: &RequestId, actor_role: &str, reason: &str) -> Result<Request> {
        if reason.trim().is_empty() {
            return Err(WorkflowError::InvalidArgument(
                "rejection reason must not be empty".to_string(),
            ));
        }

        let stages = &self.stages;

        let updated = self.store.update(id, &mut |request| {
            Self::check_actionable(stages, request, actor_role)?;
            request.reject(actor_role, reason);
            Ok(())
        })?;

        log::info!(
            "Request {} rejected by {}: {}",
            updated.id,
            actor_role,
            reason
        );
        Ok(updated)
    }

    /// Shared precondition check for approve and reject. Runs inside the
    /// store's atomic update so the decision is made against the current
    /// stage, not a stale read.
    fn check_actionable(
        stages: &StageTable,
        request: &Request,
        actor_role: &str,
    ) -> Result<()> {
        if request.is_finalized() {
            return Err(WorkflowError::AlreadyFinalized(format!(
                "request {} is already {:?}",
                request.id, request.status
            )));
        }

        let authorized = stages.role_for(request.stage).ok_or_else(|| {
            WorkflowError::Config(format!("no role configured for stage {}", request.stage))
        })?;

        if actor_role != authorized {
            log::warn!(
                "Role {:?} denied on request {} at stage {} (authorized role: {:?})",
                actor_role,
                request.id,
                request.stage,
                authorized
            );
            return Err(WorkflowError::Unauthorized(format!(
                "role {:?} may not act on stage {}",
                actor_role, request.stage
            )));
        }

        Ok(())
    }

    /// Single request by id
    pub fn request(&self, id: &RequestId) -> Result<Request> {
        self.store.get(id)
    }

    /// All requests submitted by one employee, in submission order
    pub fn requests_for_employee(&self, employee_id: &EmployeeId) -> Result<Vec<Request>> {
        self.store.list_by_employee(employee_id)
    }

    /// Pending requests sitting at one reviewer stage
    pub fn inbox(&self, stage: u32) -> Result<Vec<Request>> {
        if !self.stages.is_review_stage(stage) {
            return Err(WorkflowError::InvalidArgument(format!(
                "stage {} is not a reviewer stage",
                stage
            )));
        }

        Ok(self
            .store
            .list_by_stage(stage)?
            .into_iter()
            .filter(|request| request.status == RequestStatus::Pending)
            .collect())
    }

    /// The per-reviewer inbox, addressed by role instead of stage number
    pub fn inbox_for_role(&self, role: &str) -> Result<Vec<Request>> {
        let stage = self.stages.stage_for_role(role).ok_or_else(|| {
            WorkflowError::InvalidArgument(format!("unknown role: {:?}", role))
        })?;

        self.inbox(stage)
    }
}
