//! In-memory request store for tests and single-process deployments

use super::{RequestStore, UpdateFn};
use hrflow_types::{EmployeeId, Request, RequestId, Result, WorkflowError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Thread-safe in-memory store. Each request lives behind its own mutex
/// so updates to different requests proceed in parallel; the outer map
/// lock is only held long enough to find the entry.
pub struct MemoryStore {
    requests: RwLock<HashMap<RequestId, Arc<Mutex<Request>>>>,
    // Submission order for the per-employee listing
    order: Mutex<Vec<RequestId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            order: Mutex::new(Vec::new()),
        }
    }

    fn entry(&self, id: &RequestId) -> Result<Arc<Mutex<Request>>> {
        let map = self.requests.read().map_err(|_| poisoned())?;
        map.get(id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(format!("request {}", id)))
    }

    fn snapshot(&self) -> Result<Vec<Request>> {
        let ids: Vec<RequestId> = self.order.lock().map_err(|_| poisoned())?.clone();

        let mut requests = Vec::with_capacity(ids.len());
        for id in &ids {
            let entry = self.entry(id)?;
            let guard = entry.lock().map_err(|_| poisoned())?;
            requests.push(guard.clone());
        }

        Ok(requests)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> WorkflowError {
    WorkflowError::Storage("request store lock poisoned".to_string())
}

impl RequestStore for MemoryStore {
    fn create(&self, request: Request) -> Result<Request> {
        let mut map = self.requests.write().map_err(|_| poisoned())?;

        if map.contains_key(&request.id) {
            return Err(WorkflowError::Storage(format!(
                "duplicate request id {}",
                request.id
            )));
        }

        map.insert(request.id.clone(), Arc::new(Mutex::new(request.clone())));
        self.order.lock().map_err(|_| poisoned())?.push(request.id.clone());

        log::debug!("Stored request {}", request.id);
        Ok(request)
    }

    fn get(&self, id: &RequestId) -> Result<Request> {
        let entry = self.entry(id)?;
        let guard = entry.lock().map_err(|_| poisoned())?;
        Ok(guard.clone())
    }

    fn update(&self, id: &RequestId, apply: UpdateFn<'_>) -> Result<Request> {
        let entry = self.entry(id)?;
        let mut guard = entry.lock().map_err(|_| poisoned())?;

        // Mutate a copy; commit only if the mutation succeeds
        let mut candidate = guard.clone();
        apply(&mut candidate)?;

        *guard = candidate.clone();
        Ok(candidate)
    }

    fn list_by_employee(&self, employee_id: &EmployeeId) -> Result<Vec<Request>> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|request| &request.employee_id == employee_id)
            .collect())
    }

    fn list_by_stage(&self, stage: u32) -> Result<Vec<Request>> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|request| request.stage == stage)
            .collect())
    }
}
