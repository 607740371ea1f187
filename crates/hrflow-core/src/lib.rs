//! HR request workflow core library
//!
//! The approval workflow engine: a request submitted by an employee moves
//! through a fixed, configurable chain of reviewer stages until it is
//! fully approved or rejected. This crate holds the stage table, the
//! request store abstraction with its in-memory and file-backed
//! implementations, and the state machine itself.

pub mod config;
pub mod engine;
pub mod stages;
pub mod store;

// Re-export main types for easy access
pub use config::{ServerConfig, StorageConfig, WorkflowConfig};
pub use engine::WorkflowEngine;
pub use stages::{StageEntry, StageTable};
pub use store::{FileStore, MemoryStore, RequestStore};

// Re-export the shared data types alongside the engine
pub use hrflow_types::{
    DateRange, EmployeeId, Request, RequestId, RequestPayload, RequestStatus, RequestSubmission,
    RequestType, Result, Transition, TransitionAction, WorkflowError, REJECTED_STAGE, SYSTEM_ACTOR,
};
