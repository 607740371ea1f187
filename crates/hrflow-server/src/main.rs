//! HR request workflow service executable

mod grpc_service;

use clap::{Arg, Command};
use hrflow_core::{FileStore, MemoryStore, RequestStore, WorkflowConfig, WorkflowEngine};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging with INFO as default if RUST_LOG not set
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let matches = Command::new("hrflow-server")
        .version("1.0.0")
        .about("HR request approval workflow service")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Configuration file path (JSON)")
        )
        .arg(
            Arg::new("grpc-port")
                .long("grpc-port")
                .value_name("PORT")
                .help("Override the configured gRPC port")
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .help("Directory for the file-backed request store")
        )
        .get_matches();

    // Load configuration
    let config = match matches.get_one::<String>("config") {
        Some(path) => {
            let config = WorkflowConfig::from_file(path)?;
            log::info!("Loaded configuration from {}", path);
            config
        }
        None => {
            log::info!("No configuration file given, using defaults");
            WorkflowConfig::default()
        }
    };

    // A malformed stage table must stop the process here, not surface later
    let stage_table = config.stage_table()?;
    log::info!(
        "Stage chain loaded: {} reviewer stages, terminal stage {}",
        stage_table.review_stage_count(),
        stage_table.terminal_stage()
    );
    for entry in stage_table.entries() {
        log::debug!("Stage {} -> role {:?}", entry.stage, entry.role);
    }

    // Pick the request store
    let data_dir = matches
        .get_one::<String>("data-dir")
        .cloned()
        .or_else(|| config.storage.data_dir.clone());

    let store: Arc<dyn RequestStore> = match &data_dir {
        Some(dir) => {
            log::info!("Using file-backed request store at {}", dir);
            Arc::new(FileStore::new(dir)?)
        }
        None => {
            log::info!("Using in-memory request store");
            Arc::new(MemoryStore::new())
        }
    };

    let engine = Arc::new(WorkflowEngine::new(stage_table, store));

    let port: u16 = match matches.get_one::<String>("grpc-port") {
        Some(raw) => raw
            .parse()
            .map_err(|e| format!("Invalid port {:?}: {}", raw, e))?,
        None => config.server.grpc_port,
    };
    let addr = format!("0.0.0.0:{}", port).parse()?;

    grpc_service::start_grpc_server(engine, addr).await
}
