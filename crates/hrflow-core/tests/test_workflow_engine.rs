//! End-to-end tests for the approval workflow engine

use hrflow_core::{
    EmployeeId, FileStore, MemoryStore, RequestPayload, RequestStatus, RequestSubmission,
    RequestType, StageTable, WorkflowEngine, WorkflowError, REJECTED_STAGE,
};
use std::sync::Arc;
use tempfile::TempDir;

fn leave_submission(employee: &str) -> RequestSubmission {
    RequestSubmission {
        employee_id: EmployeeId::new(employee),
        employee_name: "Ahmed Saleh".to_string(),
        request_type: RequestType::Leave,
        subtype: Some("annual".to_string()),
        title: "Annual leave".to_string(),
        payload: RequestPayload {
            date_range: None,
            amount: None,
            notes: Some("Family visit".to_string()),
        },
    }
}

/// The reference walk-through: supervisor approves, a wrong-role reviewer
/// is denied without side effects, the department manager rejects with a
/// reason, and the request is then frozen.
#[test]
fn test_leave_request_walkthrough() {
    let engine = WorkflowEngine::new(StageTable::default_chain(), Arc::new(MemoryStore::new()));

    let request = engine.submit(leave_submission("001")).unwrap();
    assert_eq!(request.stage, 2);
    assert_eq!(engine.stages().role_for(request.stage), Some("Supervisor"));
    assert_eq!(request.status, RequestStatus::Pending);

    let request = engine.approve(&request.id, "Supervisor").unwrap();
    assert_eq!(request.stage, 3);
    assert_eq!(
        engine.stages().role_for(request.stage),
        Some("Department Manager")
    );
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.history.len(), 2);

    // HR Manager is the wrong role for stage 3
    let denied = engine.approve(&request.id, "HR Manager");
    assert!(matches!(denied, Err(WorkflowError::Unauthorized(_))));
    let stored = engine.request(&request.id).unwrap();
    assert_eq!(stored.stage, 3);
    assert_eq!(stored.history.len(), 2);

    let rejected = engine
        .reject(&request.id, "Department Manager", "insufficient balance")
        .unwrap();
    assert_eq!(rejected.stage, REJECTED_STAGE);
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(rejected.history.len(), 3);
    assert_eq!(
        rejected.history[2].reason.as_deref(),
        Some("insufficient balance")
    );

    for role in ["Supervisor", "Department Manager", "HR Manager"] {
        assert!(matches!(
            engine.approve(&rejected.id, role),
            Err(WorkflowError::AlreadyFinalized(_))
        ));
    }
}

/// Replaying the audit trail must reproduce the stored stage at every
/// point of the lifecycle, against both store implementations.
#[test]
fn test_history_replay_matches_stored_stage() {
    let temp_dir = TempDir::new().unwrap();
    let stores: Vec<Arc<dyn hrflow_core::RequestStore>> = vec![
        Arc::new(MemoryStore::new()),
        Arc::new(FileStore::new(temp_dir.path()).unwrap()),
    ];

    for store in stores {
        let engine = WorkflowEngine::new(StageTable::default_chain(), store);
        let request = engine.submit(leave_submission("001")).unwrap();
        assert_eq!(request.replayed_stage(), Some(request.stage));

        let request = engine.approve(&request.id, "Supervisor").unwrap();
        assert_eq!(request.replayed_stage(), Some(request.stage));

        let request = engine
            .reject(&request.id, "Department Manager", "policy conflict")
            .unwrap();
        assert_eq!(request.replayed_stage(), Some(request.stage));
        assert_eq!(request.replayed_stage(), Some(REJECTED_STAGE));
    }
}

/// Two correctly-authorized callers racing on the same request: exactly
/// one advance wins, the loser observes the post-state.
#[test]
fn test_concurrent_approvals_yield_one_winner() {
    let engine = Arc::new(WorkflowEngine::new(
        StageTable::default_chain(),
        Arc::new(MemoryStore::new()),
    ));

    for _ in 0..20 {
        let request = engine.submit(leave_submission("001")).unwrap();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let engine = engine.clone();
                let id = request.id.clone();
                std::thread::spawn(move || engine.approve(&id, "Supervisor"))
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("approval thread panicked"))
            .collect();

        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1, "exactly one approval must advance the request");

        for result in &results {
            if let Err(e) = result {
                assert!(
                    matches!(
                        e,
                        WorkflowError::Unauthorized(_) | WorkflowError::AlreadyFinalized(_)
                    ),
                    "loser must see the post-state, got: {}",
                    e
                );
            }
        }

        let stored = engine.request(&request.id).unwrap();
        assert_eq!(stored.stage, 3);
        assert_eq!(stored.history.len(), 2);
    }
}

/// An approve and a reject racing on the final reviewer stage serialize
/// to one winner with a consistent terminal state.
#[test]
fn test_racing_approve_and_reject_serialize() {
    let engine = Arc::new(WorkflowEngine::new(
        StageTable::default_chain(),
        Arc::new(MemoryStore::new()),
    ));

    for _ in 0..20 {
        let request = engine.submit(leave_submission("001")).unwrap();
        for role in ["Supervisor", "Department Manager", "HR Manager"] {
            engine.approve(&request.id, role).unwrap();
        }

        let approver = {
            let engine = engine.clone();
            let id = request.id.clone();
            std::thread::spawn(move || engine.approve(&id, "General Manager"))
        };
        let rejecter = {
            let engine = engine.clone();
            let id = request.id.clone();
            std::thread::spawn(move || engine.reject(&id, "General Manager", "budget freeze"))
        };

        let outcomes = [
            approver.join().expect("approve thread panicked"),
            rejecter.join().expect("reject thread panicked"),
        ];

        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);

        let stored = engine.request(&request.id).unwrap();
        assert!(stored.is_finalized());
        // History reflects only the winning transition
        assert_eq!(stored.history.len(), 5);
        assert_eq!(stored.replayed_stage(), Some(stored.stage));

        match stored.status {
            RequestStatus::Approved => assert_eq!(stored.stage, 6),
            RequestStatus::Rejected => assert_eq!(stored.stage, REJECTED_STAGE),
            RequestStatus::Pending => panic!("request must be finalized"),
        }
    }
}

/// The whole lifecycle against the file store, across a simulated restart.
#[test]
fn test_file_backed_engine_survives_restart_mid_chain() {
    let temp_dir = TempDir::new().unwrap();
    let request_id;

    {
        let store = Arc::new(FileStore::new(temp_dir.path()).unwrap());
        let engine = WorkflowEngine::new(StageTable::default_chain(), store);

        let request = engine.submit(leave_submission("001")).unwrap();
        engine.approve(&request.id, "Supervisor").unwrap();
        request_id = request.id;
    }

    {
        let store = Arc::new(FileStore::new(temp_dir.path()).unwrap());
        let engine = WorkflowEngine::new(StageTable::default_chain(), store);

        let request = engine.request(&request_id).unwrap();
        assert_eq!(request.stage, 3);
        assert_eq!(request.history.len(), 2);

        for role in ["Department Manager", "HR Manager", "General Manager"] {
            engine.approve(&request_id, role).unwrap();
        }

        let request = engine.request(&request_id).unwrap();
        assert_eq!(request.status, RequestStatus::Approved);
        assert_eq!(request.stage, engine.stages().terminal_stage());
        assert_eq!(request.replayed_stage(), Some(request.stage));
    }
}
