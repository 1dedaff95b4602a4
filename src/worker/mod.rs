//! Worker node: accepts dispatched batches over HTTP, runs a bounded pool
//! of concurrent task executors, and reports health and metrics.

mod executor;
mod health;
mod queue;
mod server;
mod task_exec;

pub use health::WorkerHealth;
pub use task_exec::{ExecutorRegistry, TaskExecutor};

use crate::config::WorkerConfig;
use crate::error::Result;
use crate::metrics::Metrics;
use executor::ExecutorPool;
use queue::{TaskQueue, TaskQueueReceiver};
use std::sync::Arc;
use tracing::info;

/// Owns the queue, executor pool, health tracker and HTTP server for one
/// worker process.
pub struct Worker {
    config: WorkerConfig,
    health: Arc<WorkerHealth>,
    pool: Arc<ExecutorPool>,
    queue: TaskQueue,
    rx: Option<TaskQueueReceiver>,
    metrics: Metrics,
}

impl Worker {
    pub fn new(config: WorkerConfig, registry: ExecutorRegistry) -> Result<Self> {
        config.validate()?;
        let health = WorkerHealth::new(config.max_concurrent);
        let pool = Arc::new(ExecutorPool::new(
            Arc::new(registry),
            Arc::clone(&health),
            config.max_concurrent,
            config.process_timeout,
        ));
        let (queue, rx) = TaskQueue::bounded(config.queue_size);
        Ok(Self {
            config,
            health,
            pool,
            queue,
            rx: Some(rx),
            metrics: Metrics::new(),
        })
    }

    /// Binds the HTTP listener and runs until the process is killed or
    /// the returned future is dropped. Spawns the queue-drain loop and the
    /// 5s health-snapshot ticker alongside the server.
    pub async fn serve(mut self) -> Result<()> {
        let rx = self.rx.take().expect("serve called more than once");
        self.health.spawn_ticker();

        let pool = Arc::clone(&self.pool);
        tokio::spawn(pool.run(rx));

        let router = server::create_router(self.queue.clone(), Arc::clone(&self.health), Arc::clone(&self.pool), self.metrics.clone());
        let listener = tokio::net::TcpListener::bind(&self.config.listen_address)
            .await
            .map_err(|e| crate::error::CoordinatorError::InvalidConfig(format!("binding {}: {e}", self.config.listen_address)))?;

        info!(address = %self.config.listen_address, worker_id = %self.config.id, "worker listening");
        axum::serve(listener, router)
            .await
            .map_err(|e| crate::error::CoordinatorError::Internal(e.to_string()))?;
        Ok(())
    }

    pub fn queue_handle(&self) -> TaskQueue {
        self.queue.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_validates_config() {
        let mut cfg = WorkerConfig::default();
        cfg.max_concurrent = 0;
        assert!(Worker::new(cfg, ExecutorRegistry::new()).is_err());
    }
}
