//! Generated gRPC code for the HR workflow service

// Re-export all generated code
pub mod hrflow {
    pub mod v1 {
        // Include the generated proto code
        tonic::include_proto!("hrflow.v1");
    }
}

// Convenience re-exports
pub use hrflow::v1::*;

// Re-export service traits
pub use hrflow::v1::workflow_service_server::{WorkflowService, WorkflowServiceServer};
pub use hrflow::v1::health_server::{Health, HealthServer};

// Re-export client types
pub use hrflow::v1::workflow_service_client::WorkflowServiceClient;
pub use hrflow::v1::health_client::HealthClient;
