use crate::balance::{NodeSnapshot, NodeStatus};
use crate::client::WorkerClient;
use crate::tracker::ResponseTimeTracker;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

const RESPONSE_TIME_CAPACITY: usize = 128;

/// Coordinator-owned record for one registered worker node. Created on
/// Register, mutated in place by the health-check and dispatch loops,
/// destroyed on Unregister.
pub struct WorkerNodeRecord {
    pub id: String,
    pub address: String,
    pub capacity: u32,
    pub status: RwLock<NodeStatus>,
    pub active_tasks: AtomicU32,
    pub processed_count: AtomicU64,
    pub error_count: AtomicU64,
    pub last_heartbeat: RwLock<DateTime<Utc>>,
    pub response_times: Mutex<ResponseTimeTracker>,
    pub client: Arc<dyn WorkerClient>,
}

impl WorkerNodeRecord {
    pub fn new(id: impl Into<String>, address: impl Into<String>, capacity: u32, client: Arc<dyn WorkerClient>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            capacity,
            status: RwLock::new(NodeStatus::Healthy),
            active_tasks: AtomicU32::new(0),
            processed_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            last_heartbeat: RwLock::new(Utc::now()),
            response_times: Mutex::new(ResponseTimeTracker::new(RESPONSE_TIME_CAPACITY)),
            client,
        }
    }

    pub fn status(&self) -> NodeStatus {
        *self.status.read()
    }

    pub fn set_status(&self, status: NodeStatus) {
        *self.status.write() = status;
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id.clone(),
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            capacity: self.capacity,
            status: self.status(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.status(), NodeStatus::Healthy | NodeStatus::Degraded)
    }

    pub fn record_dispatch_start(&self, n: u32) {
        self.active_tasks.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_dispatch_end(&self, n: u32) {
        self.active_tasks.fetch_sub(n, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.processed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn error_rate(&self) -> f64 {
        let processed = self.processed_count.load(Ordering::Relaxed);
        let errors = self.error_count.load(Ordering::Relaxed);
        let total = processed + errors;
        if total == 0 {
            0.0
        } else {
            errors as f64 / total as f64
        }
    }

    pub fn load(&self) -> f64 {
        self.active_tasks.load(Ordering::Relaxed) as f64 / self.capacity.max(1) as f64
    }
}
