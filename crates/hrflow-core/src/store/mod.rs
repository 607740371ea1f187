//! Request store abstraction
//!
//! The engine works against this trait only; persistence technology is a
//! deployment choice. Both bundled implementations guarantee atomic
//! read-modify-write per request id: the mutation closure runs under an
//! exclusive per-request lock, and a failed mutation leaves the stored
//! request untouched. Operations on distinct request ids never block
//! each other.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use hrflow_types::{EmployeeId, Request, RequestId, Result};

/// Mutation applied under the store's per-request exclusive lock
pub type UpdateFn<'a> = &'a mut dyn FnMut(&mut Request) -> Result<()>;

/// Keyed collection of workflow requests
pub trait RequestStore: Send + Sync {
    /// Persist a newly submitted request. The id must not already exist.
    fn create(&self, request: Request) -> Result<Request>;

    /// Look up a request by id. `NotFound` if absent.
    fn get(&self, id: &RequestId) -> Result<Request>;

    /// Atomically read, mutate, and write back one request. If `apply`
    /// returns an error nothing is written and that error is returned.
    fn update(&self, id: &RequestId, apply: UpdateFn<'_>) -> Result<Request>;

    /// All requests submitted by one employee, in submission order
    fn list_by_employee(&self, employee_id: &EmployeeId) -> Result<Vec<Request>>;

    /// All requests currently sitting at the given stage
    fn list_by_stage(&self, stage: u32) -> Result<Vec<Request>>;
}
