//! Coordinator: node registry, health-check loop, submission API,
//! batching/dispatch loop and retry loop. Composes a partitioner, a
//! balancer, metrics, and one client per registered node.

mod dispatch;
mod health;
mod node;
mod registry;

pub use node::WorkerNodeRecord;
pub use registry::NodeRegistry;

use crate::balance::NodeStatus;
use crate::client::WorkerClient;
use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, Result};
use crate::metrics::Metrics;
use crate::task::Task;
use crate::{balance, partition};
use dispatch::Shared;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct NodeStatusView {
    pub id: String,
    pub address: String,
    pub status: NodeStatusLabel,
    pub capacity: u32,
    pub active_tasks: u32,
    pub processed_count: u64,
    pub error_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeStatusLabel {
    Healthy,
    Degraded,
    Unhealthy,
    Offline,
}

impl From<NodeStatus> for NodeStatusLabel {
    fn from(s: NodeStatus) -> Self {
        match s {
            NodeStatus::Healthy => NodeStatusLabel::Healthy,
            NodeStatus::Degraded => NodeStatusLabel::Degraded,
            NodeStatus::Unhealthy => NodeStatusLabel::Unhealthy,
            NodeStatus::Offline => NodeStatusLabel::Offline,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStatus {
    pub nodes: Vec<NodeStatusView>,
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_retried: u64,
}

struct Loops {
    dispatch: JoinHandle<()>,
    health: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

/// Public coordinator API: `register_node`, `unregister_node`, `submit`,
/// `submit_batch`, `get_status`, `shutdown`.
pub struct Coordinator {
    shared: Arc<Shared>,
    submit_tx: mpsc::Sender<Task>,
    loops: Loops,
    shut_down: AtomicBool,
}

impl Coordinator {
    /// Builds the partitioner/balancer from config, registers the
    /// background dispatch and health-check loops, and returns a ready
    /// coordinator. Must be called from within a Tokio runtime.
    pub fn spawn(config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;

        let partitioner = partition::build(&config.partition_strategy, 128)?;
        let balancer_strategy = config.load_balance_strategy.clone();
        let balancer = balance::build(&balancer_strategy)?;
        let registry = Arc::new(NodeRegistry::new());
        let metrics = Metrics::new();

        let (submit_tx, submit_rx) = mpsc::channel(config.queue_size);
        let (retry_tx, retry_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let shared = Arc::new(Shared {
            config: config.clone(),
            registry: Arc::clone(&registry),
            partitioner,
            balancer,
            metrics: metrics.clone(),
            retry_tx,
        });

        let dispatch_handle = tokio::spawn(dispatch::run_dispatch_loop(Arc::clone(&shared), submit_rx, retry_rx, stop_rx.clone()));
        let health_handle = tokio::spawn(run_health_check_loop(Arc::clone(&shared), stop_rx));

        Ok(Self {
            shared,
            submit_tx,
            loops: Loops {
                dispatch: dispatch_handle,
                health: health_handle,
                stop: stop_tx,
            },
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn register_node(&self, id: impl Into<String>, address: impl Into<String>, capacity: u32, client: Arc<dyn WorkerClient>) -> Result<()> {
        let id = id.into();
        let address = address.into();
        self.shared.registry.register(&id, &address, capacity, client)?;
        self.shared.partitioner.add_node(&id, 1);
        self.shared.metrics.record_node_registered();
        info!(node = %id, %address, capacity, "node registered");
        Ok(())
    }

    pub fn unregister_node(&self, id: &str) -> Result<()> {
        self.shared.registry.unregister(id)?;
        self.shared.partitioner.remove_node(id);
        self.shared.metrics.record_node_unregistered();
        info!(node = %id, "node unregistered");
        Ok(())
    }

    /// Non-blocking enqueue. Returns [`CoordinatorError::QueueFull`] if the
    /// bounded channel is at capacity, or [`CoordinatorError::ShutDown`]
    /// once [`Self::shutdown`] has been called.
    pub fn submit(&self, task: Task) -> Result<()> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(CoordinatorError::ShutDown);
        }
        self.shared.metrics.record_task_submitted();
        self.submit_tx.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => CoordinatorError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => CoordinatorError::ShutDown,
        })
    }

    /// Enqueues each task individually; on the first `QueueFull`, returns
    /// the index of the task that failed (tasks before it are enqueued).
    pub fn submit_batch(&self, tasks: Vec<Task>) -> std::result::Result<(), (usize, CoordinatorError)> {
        for (i, task) in tasks.into_iter().enumerate() {
            if let Err(e) = self.submit(task) {
                return Err((i, e));
            }
        }
        Ok(())
    }

    pub fn get_status(&self) -> CoordinatorStatus {
        let nodes = self
            .shared
            .registry
            .all()
            .iter()
            .map(|n| NodeStatusView {
                id: n.id.clone(),
                address: n.address.clone(),
                status: n.status().into(),
                capacity: n.capacity,
                active_tasks: n.active_tasks.load(Ordering::Relaxed),
                processed_count: n.processed_count.load(Ordering::Relaxed),
                error_count: n.error_count.load(Ordering::Relaxed),
            })
            .collect();
        CoordinatorStatus {
            nodes,
            tasks_submitted: self.shared.metrics.tasks_submitted(),
            tasks_completed: self.shared.metrics.tasks_completed(),
            tasks_failed: self.shared.metrics.tasks_failed(),
            tasks_retried: self.shared.metrics.tasks_retried(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.shared.metrics
    }

    /// Stops accepting submissions, signals both loops to stop, waits up
    /// to `timeout` for them to unwind, then closes every client
    /// regardless of whether the loops finished in time.
    pub async fn shutdown(self, timeout: Duration) -> Result<()> {
        self.shut_down.store(true, Ordering::Release);
        let _ = self.loops.stop.send(true);

        let joined = tokio::time::timeout(timeout, async {
            let _ = self.loops.dispatch.await;
            let _ = self.loops.health.await;
        })
        .await;

        for node in self.shared.registry.all() {
            node.client.close().await;
        }

        match joined {
            Ok(()) => Ok(()),
            Err(_) => {
                warn!("shutdown timed out waiting for background loops; transports closed anyway");
                Err(CoordinatorError::ShutdownTimedOut)
            }
        }
    }
}

async fn run_health_check_loop(shared: Arc<Shared>, mut stop: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(shared.config.health_check_interval);
    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = interval.tick() => {
                if shared.registry.len() < shared.config.min_nodes {
                    warn!(
                        registered = shared.registry.len(),
                        min_nodes = shared.config.min_nodes,
                        "node count below configured minimum"
                    );
                }
                let checks = shared.registry.all().into_iter().map(|node| {
                    let shared = Arc::clone(&shared);
                    async move { health::check_node(&node, shared.config.node_timeout, &shared.metrics).await }
                });
                futures::future::join_all(checks).await;
            }
        }
    }
}
