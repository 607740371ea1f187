//! The stage table: an ordered mapping from stage number to the single
//! reviewer role authorized to act there. Validated once at load time and
//! read-only for the lifetime of the engine - the transition logic never
//! hard-codes role names or stage counts.

use hrflow_types::{Result, WorkflowError};
use serde::{Deserialize, Serialize};

/// One row of the stage table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageEntry {
    pub stage: u32,
    pub role: String,
}

impl StageEntry {
    pub fn new(stage: u32, role: impl Into<String>) -> Self {
        Self {
            stage,
            role: role.into(),
        }
    }
}

/// Validated reviewer chain.
///
/// Stage 1 is the submission stage (the employee's own position in the
/// chain); stages `2..=N` are reviewer stages. Stage `N + 1` is the
/// terminal "fully approved" stage and stage 0 is "rejected" - neither
/// appears in the table because no role acts there.
#[derive(Debug, Clone)]
pub struct StageTable {
    entries: Vec<StageEntry>,
}

impl StageTable {
    /// Build a stage table, rejecting misconfiguration up front.
    /// A bad table is startup-fatal, never a per-call error.
    pub fn new(entries: Vec<StageEntry>) -> Result<Self> {
        if entries.len() < 2 {
            return Err(WorkflowError::Config(
                "stage table needs the submission stage and at least one reviewer stage"
                    .to_string(),
            ));
        }

        for (index, entry) in entries.iter().enumerate() {
            let expected = index as u32 + 1;
            if entry.stage != expected {
                return Err(WorkflowError::Config(format!(
                    "stage numbers must run contiguously from 1: expected {} but found {}",
                    expected, entry.stage
                )));
            }
            if entry.role.trim().is_empty() {
                return Err(WorkflowError::Config(format!(
                    "stage {} has an empty role",
                    entry.stage
                )));
            }
        }

        // One role per stage holds by construction: the vec is indexed by
        // stage number, so a duplicate stage would have tripped the
        // contiguity check above.
        Ok(Self { entries })
    }

    /// The platform's standard five-stage chain
    pub fn default_chain() -> Self {
        Self {
            entries: vec![
                StageEntry::new(1, "Employee"),
                StageEntry::new(2, "Supervisor"),
                StageEntry::new(3, "Department Manager"),
                StageEntry::new(4, "HR Manager"),
                StageEntry::new(5, "General Manager"),
            ],
        }
    }

    pub fn entries(&self) -> &[StageEntry] {
        &self.entries
    }

    /// Stage a request conceptually starts from before submission
    pub fn submission_stage(&self) -> u32 {
        1
    }

    /// Stage a freshly submitted request sits at
    pub fn first_review_stage(&self) -> u32 {
        2
    }

    pub fn last_review_stage(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Stage value denoting "fully approved"
    pub fn terminal_stage(&self) -> u32 {
        self.entries.len() as u32 + 1
    }

    pub fn review_stage_count(&self) -> u32 {
        self.entries.len() as u32 - 1
    }

    pub fn is_review_stage(&self, stage: u32) -> bool {
        stage >= self.first_review_stage() && stage <= self.last_review_stage()
    }

    /// The single role authorized to act at the given stage
    pub fn role_for(&self, stage: u32) -> Option<&str> {
        let index = stage.checked_sub(1)? as usize;
        self.entries.get(index).map(|entry| entry.role.as_str())
    }

    /// Stage reached when the given stage approves. The last reviewer
    /// stage advances to the terminal stage.
    pub fn successor(&self, stage: u32) -> Option<u32> {
        if stage >= 1 && stage <= self.last_review_stage() {
            Some(stage + 1)
        } else {
            None
        }
    }

    /// Reverse lookup used by the per-reviewer inbox
    pub fn stage_for_role(&self, role: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.role == role)
            .map(|entry| entry.stage)
    }
}
