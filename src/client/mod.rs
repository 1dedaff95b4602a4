//! Worker-client: how the coordinator talks to a worker node. `http`
//! ships batches over the network; `mock` is a synthetic stand-in used by
//! tests and, potentially, a future in-process RPC transport.

mod http;
mod mock;

pub use http::HttpWorkerClient;
pub use mock::MockWorkerClient;

use crate::error::Result;
use crate::task::{Task, TaskResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Snapshot reported by a worker's `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub healthy: bool,
    pub load_average: f64,
    pub error_rate: f64,
    pub queue_depth: usize,
    pub memory_usage: f64,
    pub cpu_usage: f64,
    pub last_heartbeat: chrono::DateTime<chrono::Utc>,
}

/// What the coordinator needs from a worker connection, independent of
/// the transport used to reach it.
#[async_trait]
pub trait WorkerClient: Send + Sync {
    async fn process_batch(&self, tasks: &[Task]) -> Result<Vec<TaskResult>>;
    async fn health_check(&self) -> Result<HealthSnapshot>;
    async fn close(&self);
}
