//! Shared types for the HR request workflow engine
//! No string-based state management - stages, statuses and actions are typed

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stage number recorded on a rejected request. Terminal - no transitions out.
pub const REJECTED_STAGE: u32 = 0;

/// Actor role recorded on the submission transition.
pub const SYSTEM_ACTOR: &str = "system";

/// Strongly typed RequestId backed by a UUID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Result<Self> {
        uuid::Uuid::parse_str(s)
            .map(|_| Self(s.to_string()))
            .map_err(|e| WorkflowError::InvalidArgument(format!("Invalid request id: {}", e)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly typed employee number, e.g. "001"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(String);

impl EmployeeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request categories offered by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Leave,
    Travel,
    Advance,
    Other,
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Leave => "leave",
            Self::Travel => "travel",
            Self::Advance => "advance",
            Self::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// Inclusive date range for leave and travel requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Type-specific request content. Opaque to the engine - carried through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Current lifecycle status of a request. Always consistent with `stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// State-changing action recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionAction {
    Submitted,
    Approved,
    Rejected,
}

/// One audit trail entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub timestamp: DateTime<Utc>,
    pub actor_role: String,
    pub action: TransitionAction,
    pub from_stage: Option<u32>,
    pub to_stage: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Transition {
    /// Initial entry written when a request is submitted
    pub fn submitted(to_stage: u32) -> Self {
        Self {
            timestamp: Utc::now(),
            actor_role: SYSTEM_ACTOR.to_string(),
            action: TransitionAction::Submitted,
            from_stage: None,
            to_stage,
            reason: None,
        }
    }

    /// Entry for a reviewer approval advancing the request
    pub fn approved(actor_role: &str, from_stage: u32, to_stage: u32) -> Self {
        Self {
            timestamp: Utc::now(),
            actor_role: actor_role.to_string(),
            action: TransitionAction::Approved,
            from_stage: Some(from_stage),
            to_stage,
            reason: None,
        }
    }

    /// Entry for a rejection. The reason is mandatory for this action.
    pub fn rejected(actor_role: &str, from_stage: u32, reason: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            actor_role: actor_role.to_string(),
            action: TransitionAction::Rejected,
            from_stage: Some(from_stage),
            to_stage: REJECTED_STAGE,
            reason: Some(reason.to_string()),
        }
    }
}

/// Input for creating a new request. Identity comes from the
/// already-authenticated session layer and is trusted as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSubmission {
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub request_type: RequestType,
    pub subtype: Option<String>,
    pub title: String,
    pub payload: RequestPayload,
}

/// One workflow instance moving through the reviewer chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub request_type: RequestType,
    pub subtype: Option<String>,
    pub title: String,
    pub payload: RequestPayload,
    pub stage: u32,
    pub status: RequestStatus,
    pub history: Vec<Transition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    /// Create a new pending request at the first reviewer stage with the
    /// submission recorded as the first history entry
    pub fn new(submission: RequestSubmission, first_stage: u32) -> Self {
        let now = Utc::now();
        Self {
            id: RequestId::new(),
            employee_id: submission.employee_id,
            employee_name: submission.employee_name,
            request_type: submission.request_type,
            subtype: submission.subtype,
            title: submission.title,
            payload: submission.payload,
            stage: first_stage,
            status: RequestStatus::Pending,
            history: vec![Transition::submitted(first_stage)],
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the request has reached a terminal outcome
    pub fn is_finalized(&self) -> bool {
        self.status != RequestStatus::Pending
    }

    /// Advance to the next stage after a reviewer approval
    pub fn advance(&mut self, actor_role: &str, to_stage: u32, status: RequestStatus) {
        self.history
            .push(Transition::approved(actor_role, self.stage, to_stage));
        self.stage = to_stage;
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Halt the request with a rejection. Terminal.
    pub fn reject(&mut self, actor_role: &str, reason: &str) {
        self.history
            .push(Transition::rejected(actor_role, self.stage, reason));
        self.stage = REJECTED_STAGE;
        self.status = RequestStatus::Rejected;
        self.updated_at = Utc::now();
    }

    /// Replay the audit trail and return the stage it ends at, or `None`
    /// if the entries do not chain (each `from_stage` must equal the
    /// previous entry's `to_stage`, with the submission starting from none).
    pub fn replayed_stage(&self) -> Option<u32> {
        let mut current: Option<u32> = None;
        for entry in &self.history {
            if entry.from_stage != current {
                return None;
            }
            current = Some(entry.to_stage);
        }
        current
    }
}

/// Main error type for all workflow operations
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Already finalized: {0}")]
    AlreadyFinalized(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for WorkflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;
