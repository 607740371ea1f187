//! gRPC service implementation wrapping the workflow engine

use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

use hrflow_core::WorkflowEngine;
use hrflow_grpc::{
    get_inbox_request, health_check_response, ApproveRequest, DateRange as ProtoDateRange,
    GetInboxRequest, GetRequestRequest, Health, HealthCheckRequest, HealthCheckResponse,
    HealthServer, ListEmployeeRequestsRequest, RejectRequest, Request as ProtoRequest,
    RequestList, RequestPayload as ProtoPayload, RequestStatus as ProtoStatus,
    RequestType as ProtoType, SubmitRequest, Transition as ProtoTransition,
    TransitionAction as ProtoAction, WorkflowService, WorkflowServiceServer,
};
use hrflow_types::{
    DateRange, EmployeeId, RequestId, RequestPayload, RequestStatus, RequestSubmission,
    RequestType, Transition, TransitionAction, WorkflowError,
};

/// Wrapper exposing the engine's four operations over gRPC
#[derive(Clone)]
pub struct WorkflowGrpcService {
    engine: Arc<WorkflowEngine>,
}

impl WorkflowGrpcService {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self { engine }
    }
}

/// Map engine failures onto distinct gRPC status codes
fn status_from_error(error: WorkflowError) -> Status {
    let message = error.to_string();
    match error {
        WorkflowError::NotFound(_) => Status::not_found(message),
        WorkflowError::Unauthorized(_) => Status::permission_denied(message),
        WorkflowError::AlreadyFinalized(_) => Status::failed_precondition(message),
        WorkflowError::InvalidArgument(_) => Status::invalid_argument(message),
        WorkflowError::Config(_) | WorkflowError::Storage(_) | WorkflowError::Serialization(_) => {
            Status::internal(message)
        }
    }
}

fn timestamp(dt: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    }
}

fn type_to_proto(request_type: RequestType) -> ProtoType {
    match request_type {
        RequestType::Leave => ProtoType::Leave,
        RequestType::Travel => ProtoType::Travel,
        RequestType::Advance => ProtoType::Advance,
        RequestType::Other => ProtoType::Other,
    }
}

fn type_from_proto(request_type: ProtoType) -> Result<RequestType, Status> {
    match request_type {
        ProtoType::Leave => Ok(RequestType::Leave),
        ProtoType::Travel => Ok(RequestType::Travel),
        ProtoType::Advance => Ok(RequestType::Advance),
        ProtoType::Other => Ok(RequestType::Other),
        ProtoType::Unspecified => Err(Status::invalid_argument("request type is required")),
    }
}

fn status_to_proto(status: RequestStatus) -> ProtoStatus {
    match status {
        RequestStatus::Pending => ProtoStatus::Pending,
        RequestStatus::Approved => ProtoStatus::Approved,
        RequestStatus::Rejected => ProtoStatus::Rejected,
    }
}

fn action_to_proto(action: TransitionAction) -> ProtoAction {
    match action {
        TransitionAction::Submitted => ProtoAction::Submitted,
        TransitionAction::Approved => ProtoAction::Approved,
        TransitionAction::Rejected => ProtoAction::Rejected,
    }
}

fn payload_to_proto(payload: RequestPayload) -> ProtoPayload {
    ProtoPayload {
        date_range: payload.date_range.map(|range| ProtoDateRange {
            start: range.start.to_string(),
            end: range.end.to_string(),
        }),
        amount: payload.amount,
        notes: payload.notes,
    }
}

fn payload_from_proto(payload: ProtoPayload) -> Result<RequestPayload, Status> {
    let date_range = payload
        .date_range
        .map(|range| -> Result<DateRange, Status> {
            let parse = |value: &str| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
                    Status::invalid_argument(format!("invalid date {:?}: {}", value, e))
                })
            };
            Ok(DateRange {
                start: parse(&range.start)?,
                end: parse(&range.end)?,
            })
        })
        .transpose()?;

    Ok(RequestPayload {
        date_range,
        amount: payload.amount,
        notes: payload.notes,
    })
}

fn transition_to_proto(transition: Transition) -> ProtoTransition {
    ProtoTransition {
        timestamp: Some(timestamp(transition.timestamp)),
        actor_role: transition.actor_role,
        action: action_to_proto(transition.action) as i32,
        from_stage: transition.from_stage,
        to_stage: transition.to_stage,
        reason: transition.reason,
    }
}

fn request_to_proto(request: hrflow_types::Request) -> ProtoRequest {
    ProtoRequest {
        id: request.id.to_string(),
        employee_id: request.employee_id.to_string(),
        employee_name: request.employee_name,
        request_type: type_to_proto(request.request_type) as i32,
        subtype: request.subtype,
        title: request.title,
        payload: Some(payload_to_proto(request.payload)),
        stage: request.stage,
        status: status_to_proto(request.status) as i32,
        history: request.history.into_iter().map(transition_to_proto).collect(),
        created_at: Some(timestamp(request.created_at)),
        updated_at: Some(timestamp(request.updated_at)),
    }
}

fn submission_from_proto(proto: SubmitRequest) -> Result<RequestSubmission, Status> {
    let request_type = type_from_proto(proto.request_type())?;
    let payload = proto
        .payload
        .map(payload_from_proto)
        .transpose()?
        .unwrap_or_default();

    Ok(RequestSubmission {
        employee_id: EmployeeId::new(proto.employee_id),
        employee_name: proto.employee_name,
        request_type,
        subtype: proto.subtype,
        title: proto.title,
        payload,
    })
}

fn parse_request_id(raw: &str) -> Result<RequestId, Status> {
    RequestId::from_string(raw).map_err(|e| Status::invalid_argument(e.to_string()))
}

#[tonic::async_trait]
impl WorkflowService for WorkflowGrpcService {
    async fn submit(
        &self,
        request: Request<SubmitRequest>,
    ) -> Result<Response<ProtoRequest>, Status> {
        let submission = submission_from_proto(request.into_inner())?;

        let created = self.engine.submit(submission).map_err(status_from_error)?;
        Ok(Response::new(request_to_proto(created)))
    }

    async fn approve(
        &self,
        request: Request<ApproveRequest>,
    ) -> Result<Response<ProtoRequest>, Status> {
        let req = request.into_inner();
        let id = parse_request_id(&req.request_id)?;

        let updated = self
            .engine
            .approve(&id, &req.actor_role)
            .map_err(status_from_error)?;
        Ok(Response::new(request_to_proto(updated)))
    }

    async fn reject(
        &self,
        request: Request<RejectRequest>,
    ) -> Result<Response<ProtoRequest>, Status> {
        let req = request.into_inner();
        let id = parse_request_id(&req.request_id)?;

        let updated = self
            .engine
            .reject(&id, &req.actor_role, &req.reason)
            .map_err(status_from_error)?;
        Ok(Response::new(request_to_proto(updated)))
    }

    async fn get_request(
        &self,
        request: Request<GetRequestRequest>,
    ) -> Result<Response<ProtoRequest>, Status> {
        let id = parse_request_id(&request.into_inner().request_id)?;

        let found = self.engine.request(&id).map_err(status_from_error)?;
        Ok(Response::new(request_to_proto(found)))
    }

    async fn list_employee_requests(
        &self,
        request: Request<ListEmployeeRequestsRequest>,
    ) -> Result<Response<RequestList>, Status> {
        let employee_id = EmployeeId::new(request.into_inner().employee_id);

        let requests = self
            .engine
            .requests_for_employee(&employee_id)
            .map_err(status_from_error)?;
        Ok(Response::new(RequestList {
            requests: requests.into_iter().map(request_to_proto).collect(),
        }))
    }

    async fn get_inbox(
        &self,
        request: Request<GetInboxRequest>,
    ) -> Result<Response<RequestList>, Status> {
        let reviewer = request
            .into_inner()
            .reviewer
            .ok_or_else(|| Status::invalid_argument("stage or role is required"))?;

        let requests = match reviewer {
            get_inbox_request::Reviewer::Stage(stage) => self.engine.inbox(stage),
            get_inbox_request::Reviewer::Role(role) => self.engine.inbox_for_role(&role),
        }
        .map_err(status_from_error)?;

        Ok(Response::new(RequestList {
            requests: requests.into_iter().map(request_to_proto).collect(),
        }))
    }
}

#[tonic::async_trait]
impl Health for WorkflowGrpcService {
    async fn check(
        &self,
        _request: Request<HealthCheckRequest>,
    ) -> Result<Response<HealthCheckResponse>, Status> {
        Ok(Response::new(HealthCheckResponse {
            status: health_check_response::ServingStatus::Serving as i32,
        }))
    }

    type WatchStream = Pin<Box<dyn Stream<Item = Result<HealthCheckResponse, Status>> + Send>>;

    async fn watch(
        &self,
        _request: Request<HealthCheckRequest>,
    ) -> Result<Response<Self::WatchStream>, Status> {
        let (tx, rx) = tokio::sync::mpsc::channel(10);

        tokio::spawn(async move {
            loop {
                if tx
                    .send(Ok(HealthCheckResponse {
                        status: health_check_response::ServingStatus::Serving as i32,
                    }))
                    .await
                    .is_err()
                {
                    break;
                }
                tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
            }
        });

        let stream = ReceiverStream::new(rx);
        Ok(Response::new(Box::pin(stream)))
    }
}

/// Start the gRPC server
pub async fn start_grpc_server(
    engine: Arc<WorkflowEngine>,
    addr: std::net::SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let service = WorkflowGrpcService::new(engine);

    let workflow_service = WorkflowServiceServer::new(service.clone());
    let health_service = HealthServer::new(service);

    log::info!("Starting gRPC server on {}", addr);

    match tonic::transport::Server::builder()
        .add_service(workflow_service)
        .add_service(health_service)
        .serve(addr)
        .await
    {
        Ok(_) => {
            log::info!("gRPC server stopped normally");
            Ok(())
        }
        Err(e) => {
            log::error!("Failed to start gRPC server on {}: {}", addr, e);
            Err(Box::new(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrflow_types::Request as CoreRequest;

    fn submission() -> RequestSubmission {
        RequestSubmission {
            employee_id: EmployeeId::new("001"),
            employee_name: "Ahmed Saleh".to_string(),
            request_type: RequestType::Leave,
            subtype: None,
            title: "Annual leave".to_string(),
            payload: RequestPayload {
                date_range: Some(DateRange {
                    start: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                    end: NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
                }),
                amount: None,
                notes: None,
            },
        }
    }

    #[test]
    fn test_error_mapping_is_distinct_per_kind() {
        let cases = [
            (
                WorkflowError::NotFound("x".into()),
                tonic::Code::NotFound,
            ),
            (
                WorkflowError::Unauthorized("x".into()),
                tonic::Code::PermissionDenied,
            ),
            (
                WorkflowError::AlreadyFinalized("x".into()),
                tonic::Code::FailedPrecondition,
            ),
            (
                WorkflowError::InvalidArgument("x".into()),
                tonic::Code::InvalidArgument,
            ),
            (WorkflowError::Storage("x".into()), tonic::Code::Internal),
        ];

        for (error, expected) in cases {
            assert_eq!(status_from_error(error).code(), expected);
        }
    }

    #[test]
    fn test_request_round_trips_field_names_and_history_order() {
        let mut request = CoreRequest::new(submission(), 2);
        request.advance("Supervisor", 3, RequestStatus::Pending);
        request.reject("Department Manager", "insufficient balance");

        let proto = request_to_proto(request.clone());

        assert_eq!(proto.id, request.id.to_string());
        assert_eq!(proto.employee_id, "001");
        assert_eq!(proto.stage, 0);
        assert_eq!(proto.status, ProtoStatus::Rejected as i32);
        assert_eq!(proto.history.len(), 3);
        assert_eq!(proto.history[0].action, ProtoAction::Submitted as i32);
        assert_eq!(proto.history[0].from_stage, None);
        assert_eq!(proto.history[2].reason.as_deref(), Some("insufficient balance"));

        let payload = proto.payload.unwrap();
        let range = payload.date_range.unwrap();
        assert_eq!(range.start, "2025-03-01");
        assert_eq!(range.end, "2025-03-05");
    }

    #[test]
    fn test_submission_from_proto_requires_request_type() {
        let proto = SubmitRequest {
            employee_id: "001".to_string(),
            employee_name: "Ahmed Saleh".to_string(),
            request_type: ProtoType::Unspecified as i32,
            subtype: None,
            title: "Annual leave".to_string(),
            payload: None,
        };

        let result = submission_from_proto(proto);
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().code(),
            tonic::Code::InvalidArgument
        );
    }

    #[test]
    fn test_submission_from_proto_rejects_malformed_dates() {
        let proto = SubmitRequest {
            employee_id: "001".to_string(),
            employee_name: "Ahmed Saleh".to_string(),
            request_type: ProtoType::Leave as i32,
            subtype: None,
            title: "Annual leave".to_string(),
            payload: Some(ProtoPayload {
                date_range: Some(ProtoDateRange {
                    start: "01/03/2025".to_string(),
                    end: "2025-03-05".to_string(),
                }),
                amount: None,
                notes: None,
            }),
        };

        let result = submission_from_proto(proto);
        assert_eq!(result.unwrap_err().code(), tonic::Code::InvalidArgument);
    }
}
