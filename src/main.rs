// Stream coordinator binary: runs either a `worker` or a `coordinator`
// process depending on the first positional argument.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use stream_coordinator::client::HttpWorkerClient;
use stream_coordinator::worker::{ExecutorRegistry, Worker};
use stream_coordinator::{Coordinator, CoordinatorConfig, WorkerConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "coordinator".to_string());
    let config_path = args.next();

    match mode.as_str() {
        "worker" => run_worker(config_path).await,
        "coordinator" => run_coordinator(config_path).await,
        other => {
            eprintln!("unknown mode {other:?}, expected \"worker\" or \"coordinator\"");
            eprintln!("usage: stream-coordinator <worker|coordinator> [config.json]");
            std::process::exit(2);
        }
    }
}

async fn run_worker(config_path: Option<String>) -> Result<()> {
    let config = match config_path {
        Some(path) => WorkerConfig::from_json_file(&path).with_context(|| format!("loading worker config from {path}"))?,
        None => WorkerConfig::default(),
    };
    info!(worker_id = %config.id, address = %config.listen_address, "starting worker");

    let worker = Worker::new(config, ExecutorRegistry::new()).context("constructing worker")?;
    worker.serve().await.context("worker server exited with an error")
}

async fn run_coordinator(config_path: Option<String>) -> Result<()> {
    let config = match config_path {
        Some(path) => CoordinatorConfig::from_json_file(&path).with_context(|| format!("loading coordinator config from {path}"))?,
        None => CoordinatorConfig::default(),
    };
    info!(
        partition_strategy = %config.partition_strategy,
        load_balance_strategy = %config.load_balance_strategy,
        "starting coordinator"
    );

    let coordinator = Coordinator::spawn(config).context("spawning coordinator")?;

    // Static node list until a discovery mechanism is wired in; read from
    // the COORDINATOR_NODES env var as "id=address" pairs separated by ','.
    if let Ok(nodes) = std::env::var("COORDINATOR_NODES") {
        for entry in nodes.split(',').filter(|s| !s.is_empty()) {
            let Some((id, address)) = entry.split_once('=') else {
                error!(entry, "malformed COORDINATOR_NODES entry, expected id=address");
                continue;
            };
            let client = Arc::new(HttpWorkerClient::new(id, address));
            if let Err(e) = coordinator.register_node(id, address, 10, client) {
                error!(node = id, error = %e, "failed to register node at startup");
            }
        }
    }

    info!("coordinator running, press Ctrl+C to shut down");
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;

    info!("shutting down");
    coordinator.shutdown(Duration::from_secs(10)).await.context("coordinator shutdown")
}
