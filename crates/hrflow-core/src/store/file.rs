//! File-backed request store: one JSON document per request
//!
//! Requests survive process restarts. Atomicity is per-process, via an
//! in-memory lock per request id held across the read-mutate-write cycle.

use super::{RequestStore, UpdateFn};
use hrflow_types::{EmployeeId, Request, RequestId, Result, WorkflowError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub struct FileStore {
    root_path: PathBuf,
    locks: Mutex<HashMap<RequestId, Arc<Mutex<()>>>>,
}

impl FileStore {
    /// Create a FileStore rooted at the given directory, creating it if
    /// necessary
    pub fn new<P: AsRef<Path>>(root_path: P) -> Result<Self> {
        let root_path = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root_path)?;

        Ok(Self {
            root_path,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn request_path(&self, id: &RequestId) -> PathBuf {
        self.root_path.join(format!("request_{}.json", id))
    }

    fn lock_for(&self, id: &RequestId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| poisoned())?;
        Ok(locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    fn read_request(&self, path: &Path) -> Result<Request> {
        let json = fs::read_to_string(path)?;

        serde_json::from_str(&json).map_err(|e| {
            WorkflowError::Serialization(format!("Failed to deserialize request: {}", e))
        })
    }

    fn write_request(&self, path: &Path, request: &Request) -> Result<()> {
        let json = serde_json::to_string_pretty(request).map_err(|e| {
            WorkflowError::Serialization(format!("Failed to serialize request: {}", e))
        })?;

        fs::write(path, json)?;
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Request>> {
        let mut requests = Vec::new();

        for entry in fs::read_dir(&self.root_path)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Ok(request) = self.read_request(&path) {
                    requests.push(request);
                }
            }
        }

        // Directory iteration order is arbitrary; listings are in
        // submission order
        requests.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });

        Ok(requests)
    }
}

fn poisoned() -> WorkflowError {
    WorkflowError::Storage("request store lock poisoned".to_string())
}

impl RequestStore for FileStore {
    fn create(&self, request: Request) -> Result<Request> {
        let lock = self.lock_for(&request.id)?;
        let _guard = lock.lock().map_err(|_| poisoned())?;

        let path = self.request_path(&request.id);
        if path.exists() {
            return Err(WorkflowError::Storage(format!(
                "duplicate request id {}",
                request.id
            )));
        }

        self.write_request(&path, &request)?;
        log::debug!("Stored request {} at {:?}", request.id, path);
        Ok(request)
    }

    fn get(&self, id: &RequestId) -> Result<Request> {
        let lock = self.lock_for(id)?;
        let _guard = lock.lock().map_err(|_| poisoned())?;

        let path = self.request_path(id);
        if !path.exists() {
            return Err(WorkflowError::NotFound(format!("request {}", id)));
        }

        self.read_request(&path)
    }

    fn update(&self, id: &RequestId, apply: UpdateFn<'_>) -> Result<Request> {
        let lock = self.lock_for(id)?;
        let _guard = lock.lock().map_err(|_| poisoned())?;

        let path = self.request_path(id);
        if !path.exists() {
            return Err(WorkflowError::NotFound(format!("request {}", id)));
        }

        // Mutate a copy; write back only if the mutation succeeds
        let mut candidate = self.read_request(&path)?;
        apply(&mut candidate)?;

        self.write_request(&path, &candidate)?;
        Ok(candidate)
    }

    fn list_by_employee(&self, employee_id: &EmployeeId) -> Result<Vec<Request>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|request| &request.employee_id == employee_id)
            .collect())
    }

    fn list_by_stage(&self, stage: u32) -> Result<Vec<Request>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|request| request.stage == stage)
            .collect())
    }
}
