//! Prometheus-style metrics: a handful of counters, two gauges, and
//! dynamic per-node / per-aggregate buckets, all served as text exposition
//! from the coordinator's `/metrics` endpoint.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct AggregateBucket {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl AggregateBucket {
    fn observe(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Central metrics registry for a coordinator process.
///
/// Counters are plain atomics; the two gauges and the per-node /
/// per-aggregate buckets live behind `RwLock`s since they're read far less
/// often than they're written.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    tasks_submitted_total: AtomicU64,
    tasks_completed_total: AtomicU64,
    tasks_failed_total: AtomicU64,
    tasks_retried_total: AtomicU64,
    nodes_registered_total: AtomicU64,
    nodes_unregistered_total: AtomicU64,
    health_check_failures_total: AtomicU64,
    node_errors_total: RwLock<HashMap<String, u64>>,
    task_success_rate: RwLock<f64>,
    task_processing_time_ms: RwLock<f64>,
    aggregates: RwLock<HashMap<String, AggregateBucket>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                tasks_submitted_total: AtomicU64::new(0),
                tasks_completed_total: AtomicU64::new(0),
                tasks_failed_total: AtomicU64::new(0),
                tasks_retried_total: AtomicU64::new(0),
                nodes_registered_total: AtomicU64::new(0),
                nodes_unregistered_total: AtomicU64::new(0),
                health_check_failures_total: AtomicU64::new(0),
                node_errors_total: RwLock::new(HashMap::new()),
                task_success_rate: RwLock::new(1.0),
                task_processing_time_ms: RwLock::new(0.0),
                aggregates: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn record_task_submitted(&self) {
        self.inner.tasks_submitted_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_completed(&self, processing_time_ms: f64) {
        self.inner.tasks_completed_total.fetch_add(1, Ordering::Relaxed);
        *self.inner.task_processing_time_ms.write() = processing_time_ms;
        self.recompute_success_rate();
    }

    pub fn record_task_failed(&self) {
        self.inner.tasks_failed_total.fetch_add(1, Ordering::Relaxed);
        self.recompute_success_rate();
    }

    pub fn record_task_retried(&self) {
        self.inner.tasks_retried_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_node_registered(&self) {
        self.inner.nodes_registered_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_node_unregistered(&self) {
        self.inner.nodes_unregistered_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_health_check_failure(&self, node_id: &str) {
        self.inner.health_check_failures_total.fetch_add(1, Ordering::Relaxed);
        *self.inner.node_errors_total.write().entry(node_id.to_string()).or_insert(0) += 1;
    }

    pub fn record_aggregate(&self, name: &str, value: f64) {
        self.inner
            .aggregates
            .write()
            .entry(name.to_string())
            .or_default()
            .observe(value);
    }

    fn recompute_success_rate(&self) {
        let completed = self.inner.tasks_completed_total.load(Ordering::Relaxed);
        let failed = self.inner.tasks_failed_total.load(Ordering::Relaxed);
        let total = completed + failed;
        let rate = if total == 0 { 1.0 } else { completed as f64 / total as f64 };
        *self.inner.task_success_rate.write() = rate;
    }

    pub fn tasks_submitted(&self) -> u64 {
        self.inner.tasks_submitted_total.load(Ordering::Relaxed)
    }

    pub fn tasks_completed(&self) -> u64 {
        self.inner.tasks_completed_total.load(Ordering::Relaxed)
    }

    pub fn tasks_failed(&self) -> u64 {
        self.inner.tasks_failed_total.load(Ordering::Relaxed)
    }

    pub fn tasks_retried(&self) -> u64 {
        self.inner.tasks_retried_total.load(Ordering::Relaxed)
    }

    pub fn health_check_failures(&self) -> u64 {
        self.inner.health_check_failures_total.load(Ordering::Relaxed)
    }

    pub fn node_errors(&self, node_id: &str) -> u64 {
        *self.inner.node_errors_total.read().get(node_id).unwrap_or(&0)
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn export(&self) -> String {
        let mut out = String::new();

        push_counter(&mut out, "tasks_submitted_total", "Total tasks submitted", self.tasks_submitted());
        push_counter(&mut out, "tasks_completed_total", "Total tasks completed successfully", self.tasks_completed());
        push_counter(&mut out, "tasks_failed_total", "Total tasks that exhausted retries", self.tasks_failed());
        push_counter(&mut out, "tasks_retried_total", "Total retry attempts", self.tasks_retried());
        push_counter(
            &mut out,
            "nodes_registered_total",
            "Total worker nodes registered",
            self.inner.nodes_registered_total.load(Ordering::Relaxed),
        );
        push_counter(
            &mut out,
            "nodes_unregistered_total",
            "Total worker nodes unregistered",
            self.inner.nodes_unregistered_total.load(Ordering::Relaxed),
        );
        push_counter(
            &mut out,
            "health_check_failures_total",
            "Total failed health checks",
            self.health_check_failures(),
        );

        out.push_str("# HELP node_errors_total Per-node error count\n");
        out.push_str("# TYPE node_errors_total counter\n");
        for (node, count) in self.inner.node_errors_total.read().iter() {
            out.push_str(&format!("node_errors_total{{node=\"{node}\"}} {count}\n"));
        }

        push_gauge(&mut out, "task_success_rate", "Ratio of completed to (completed+failed) tasks", *self.inner.task_success_rate.read());
        push_gauge(
            &mut out,
            "task_processing_time_ms",
            "Most recent task processing time in milliseconds",
            *self.inner.task_processing_time_ms.read(),
        );

        for (name, bucket) in self.inner.aggregates.read().iter() {
            out.push_str(&format!("# HELP aggregate_{name}_count Sample count for aggregate {name}\n"));
            out.push_str(&format!("# TYPE aggregate_{name}_count gauge\n"));
            out.push_str(&format!("aggregate_{name}_count {}\n", bucket.count));
            out.push_str(&format!("# HELP aggregate_{name}_avg Sample average for aggregate {name}\n"));
            out.push_str(&format!("# TYPE aggregate_{name}_avg gauge\n"));
            out.push_str(&format!("aggregate_{name}_avg {}\n", bucket.avg()));
            out.push_str(&format!("# HELP aggregate_{name}_min Sample minimum for aggregate {name}\n"));
            out.push_str(&format!("# TYPE aggregate_{name}_min gauge\n"));
            out.push_str(&format!("aggregate_{name}_min {}\n", bucket.min));
            out.push_str(&format!("# HELP aggregate_{name}_max Sample maximum for aggregate {name}\n"));
            out.push_str(&format!("# TYPE aggregate_{name}_max gauge\n"));
            out.push_str(&format!("aggregate_{name}_max {}\n", bucket.max));
        }

        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn push_counter(out: &mut String, name: &str, help: &str, value: u64) {
    out.push_str(&format!("# HELP {name} {help}\n"));
    out.push_str(&format!("# TYPE {name} counter\n"));
    out.push_str(&format!("{name} {value}\n"));
}

fn push_gauge(out: &mut String, name: &str, help: &str, value: f64) {
    out.push_str(&format!("# HELP {name} {help}\n"));
    out.push_str(&format!("# TYPE {name} gauge\n"));
    out.push_str(&format!("{name} {value}\n"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = Metrics::new();
        assert_eq!(m.tasks_submitted(), 0);
        assert_eq!(m.tasks_completed(), 0);
    }

    #[test]
    fn success_rate_tracks_completed_vs_failed() {
        let m = Metrics::new();
        m.record_task_completed(5.0);
        m.record_task_completed(5.0);
        m.record_task_failed();
        assert!((*m.inner.task_success_rate.read() - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn node_errors_are_tracked_per_node() {
        let m = Metrics::new();
        m.record_health_check_failure("n1");
        m.record_health_check_failure("n1");
        m.record_health_check_failure("n2");
        assert_eq!(m.node_errors("n1"), 2);
        assert_eq!(m.node_errors("n2"), 1);
        assert_eq!(m.health_check_failures(), 3);
    }

    #[test]
    fn export_contains_required_exposition_lines() {
        let m = Metrics::new();
        m.record_task_submitted();
        m.record_task_completed(12.0);
        let text = m.export();
        assert!(text.contains("tasks_submitted_total"));
        assert!(text.contains("tasks_completed_total"));
        assert!(text.contains("tasks_failed_total"));
        assert!(text.contains("task_success_rate"));
        assert!(text.contains("nodes_registered_total"));
        assert!(text.contains("# HELP"));
        assert!(text.contains("# TYPE"));
    }

    #[test]
    fn aggregate_buckets_report_count_avg_min_max() {
        let m = Metrics::new();
        m.record_aggregate("latency", 10.0);
        m.record_aggregate("latency", 20.0);
        m.record_aggregate("latency", 30.0);
        let text = m.export();
        assert!(text.contains("aggregate_latency_count 3"));
        assert!(text.contains("aggregate_latency_avg 20"));
        assert!(text.contains("aggregate_latency_min 10"));
        assert!(text.contains("aggregate_latency_max 30"));
    }
}
