use crate::client::HealthSnapshot;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Duration as TokioDuration;

const SNAPSHOT_INTERVAL: TokioDuration = TokioDuration::from_secs(5);

/// Worker-side health counters plus a periodically-refreshed snapshot for
/// the `/health` endpoint to read without recomputing under load.
pub struct WorkerHealth {
    active_tasks: AtomicUsize,
    max_concurrent: usize,
    processed_total: AtomicU64,
    failed_total: AtomicU64,
    queue_depth: AtomicUsize,
    snapshot: RwLock<HealthSnapshot>,
    running: std::sync::atomic::AtomicBool,
}

impl WorkerHealth {
    pub fn new(max_concurrent: usize) -> Arc<Self> {
        Arc::new(Self {
            active_tasks: AtomicUsize::new(0),
            max_concurrent: max_concurrent.max(1),
            processed_total: AtomicU64::new(0),
            failed_total: AtomicU64::new(0),
            queue_depth: AtomicUsize::new(0),
            snapshot: RwLock::new(HealthSnapshot {
                healthy: true,
                load_average: 0.0,
                error_rate: 0.0,
                queue_depth: 0,
                memory_usage: 0.0,
                cpu_usage: 0.0,
                last_heartbeat: chrono::Utc::now(),
            }),
            running: std::sync::atomic::AtomicBool::new(true),
        })
    }

    pub fn task_started(&self) {
        self.active_tasks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_finished(&self, success: bool) {
        self.active_tasks.fetch_sub(1, Ordering::Relaxed);
        self.processed_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    fn compute(&self) -> HealthSnapshot {
        let active = self.active_tasks.load(Ordering::Relaxed) as f64;
        let load_average = active / self.max_concurrent as f64;
        let processed = self.processed_total.load(Ordering::Relaxed);
        let failed = self.failed_total.load(Ordering::Relaxed);
        let error_rate = if processed == 0 { 0.0 } else { failed as f64 / processed as f64 };
        HealthSnapshot {
            healthy: load_average < 0.9 && error_rate < 0.1,
            load_average,
            error_rate,
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            memory_usage: 0.0,
            cpu_usage: 0.0,
            last_heartbeat: chrono::Utc::now(),
        }
    }

    /// Latest cached snapshot, refreshed by [`Self::spawn_ticker`].
    pub fn snapshot(&self) -> HealthSnapshot {
        self.snapshot.read().clone()
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Background ticker that refreshes the cached snapshot every 5s.
    pub fn spawn_ticker(self: &Arc<Self>) {
        let health = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SNAPSHOT_INTERVAL);
            while health.running.load(Ordering::Relaxed) {
                interval.tick().await;
                let computed = health.compute();
                *health.snapshot.write() = computed;
            }
        });
    }
}
