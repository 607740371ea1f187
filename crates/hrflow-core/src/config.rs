//! Configuration management for the workflow service

use crate::stages::{StageEntry, StageTable};
use hrflow_types::{Result, WorkflowError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure, loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// The reviewer chain. Replacing this list reconfigures the whole
    /// approval workflow - the engine itself never changes.
    #[serde(default = "default_stages")]
    pub stages: Vec<StageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for the file-backed request store. When absent the
    /// service runs against the in-memory store.
    #[serde(default)]
    pub data_dir: Option<String>,
}

fn default_grpc_port() -> u16 {
    50051
}

fn default_stages() -> Vec<StageEntry> {
    StageTable::default_chain().entries().to_vec()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grpc_port: default_grpc_port(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            stages: default_stages(),
        }
    }
}

impl WorkflowConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| WorkflowError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_json_str(&content)
    }

    /// Load configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: WorkflowConfig = serde_json::from_str(json)
            .map_err(|e| WorkflowError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration. A malformed stage table fails here,
    /// at startup, rather than on a later call.
    pub fn validate(&self) -> Result<()> {
        self.stage_table().map(|_| ())
    }

    /// Build the validated stage table
    pub fn stage_table(&self) -> Result<StageTable> {
        StageTable::new(self.stages.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WorkflowConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.server.grpc_port, 50051);
        assert!(config.storage.data_dir.is_none());
        assert_eq!(config.stages.len(), 5);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = WorkflowConfig::from_json_str(r#"{"server": {"grpc_port": 9000}}"#).unwrap();

        assert_eq!(config.server.grpc_port, 9000);
        assert_eq!(config.stages.len(), 5);
        assert_eq!(config.stages[1].role, "Supervisor");
    }

    #[test]
    fn test_custom_stage_chain() {
        let json = r#"{
            "storage": {"data_dir": "/var/lib/hrflow"},
            "stages": [
                {"stage": 1, "role": "Employee"},
                {"stage": 2, "role": "Team Lead"},
                {"stage": 3, "role": "Director"}
            ]
        }"#;

        let config = WorkflowConfig::from_json_str(json).unwrap();
        let table = config.stage_table().unwrap();

        assert_eq!(config.storage.data_dir.as_deref(), Some("/var/lib/hrflow"));
        assert_eq!(table.terminal_stage(), 4);
        assert_eq!(table.role_for(2), Some("Team Lead"));
    }

    #[test]
    fn test_malformed_stage_table_is_rejected_at_load() {
        let json = r#"{
            "stages": [
                {"stage": 1, "role": "Employee"},
                {"stage": 4, "role": "Supervisor"}
            ]
        }"#;

        let result = WorkflowConfig::from_json_str(json);
        assert!(matches!(result, Err(WorkflowError::Config(_))));
    }

    #[test]
    fn test_invalid_json_is_a_config_error() {
        let result = WorkflowConfig::from_json_str("{not json");
        assert!(matches!(result, Err(WorkflowError::Config(_))));
    }
}
