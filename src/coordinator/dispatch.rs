use super::registry::NodeRegistry;
use crate::balance::{Balancer, NodeStatus};
use crate::config::CoordinatorConfig;
use crate::metrics::Metrics;
use crate::partition::Partitioner;
use crate::task::Task;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::warn;

/// Everything the dispatch and health loops need, shared behind `Arc`s so
/// the coordinator's public API and the background loops can't race on
/// ownership.
pub struct Shared {
    pub config: CoordinatorConfig,
    pub registry: Arc<NodeRegistry>,
    pub partitioner: Box<dyn Partitioner>,
    pub balancer: Box<dyn Balancer>,
    pub metrics: Metrics,
    pub retry_tx: mpsc::UnboundedSender<Task>,
}

/// Runs until both the external submission channel and the internal
/// retry channel are closed, or `stop` is flipped.
pub async fn run_dispatch_loop(
    shared: Arc<Shared>,
    mut submit_rx: mpsc::Receiver<Task>,
    mut retry_rx: mpsc::UnboundedReceiver<Task>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        if *stop.borrow() {
            break;
        }
        let batch = tokio::select! {
            biased;
            _ = stop.changed() => break,
            b = collect_batch(&mut submit_rx, &mut retry_rx, shared.config.batch_size, shared.config.batch_timeout) => b,
        };
        match batch {
            Some(tasks) if !tasks.is_empty() => dispatch_batch(&shared, tasks).await,
            Some(_) => continue,
            None => break,
        }
    }
}

async fn collect_batch(
    submit_rx: &mut mpsc::Receiver<Task>,
    retry_rx: &mut mpsc::UnboundedReceiver<Task>,
    batch_size: usize,
    batch_timeout: Duration,
) -> Option<Vec<Task>> {
    let first = tokio::select! {
        biased;
        t = retry_rx.recv() => t,
        t = submit_rx.recv() => t,
    }?;
    let mut batch = vec![first];
    let deadline = tokio::time::Instant::now() + batch_timeout;

    while batch.len() < batch_size {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        let next = tokio::time::timeout(remaining, async {
            tokio::select! {
                biased;
                t = retry_rx.recv() => t,
                t = submit_rx.recv() => t,
            }
        })
        .await;
        match next {
            Ok(Some(t)) => batch.push(t),
            Ok(None) | Err(_) => break,
        }
    }
    Some(batch)
}

async fn dispatch_batch(shared: &Arc<Shared>, tasks: Vec<Task>) {
    let mut groups: HashMap<String, Vec<Task>> = HashMap::new();
    for task in tasks {
        groups.entry(task.partition_key.clone()).or_default().push(task);
    }

    let dispatches = groups.into_iter().map(|(key, group)| {
        let shared = Arc::clone(shared);
        async move { dispatch_group(&shared, &key, group).await }
    });
    futures::future::join_all(dispatches).await;
}

async fn dispatch_group(shared: &Arc<Shared>, partition_key: &str, tasks: Vec<Task>) {
    let available_ids = shared.registry.available_ids();
    let preferred = shared.partitioner.get_node(partition_key, &available_ids);
    let snapshots = shared.registry.available_snapshots();
    let actual = shared.balancer.select_node(&preferred, &snapshots);

    if actual.is_empty() {
        requeue_all(shared, tasks, "no available worker nodes");
        return;
    }
    let Some(node) = shared.registry.get(&actual) else {
        requeue_all(shared, tasks, "selected node is no longer registered");
        return;
    };

    node.record_dispatch_start(tasks.len() as u32);
    let started = Instant::now();
    let outcome = node.client.process_batch(&tasks).await;
    node.record_dispatch_end(tasks.len() as u32);
    let elapsed = started.elapsed();

    match outcome {
        Ok(results) => {
            shared.balancer.update_metrics(&node.id, elapsed, true);
            let mut by_id: HashMap<String, _> = results.into_iter().map(|r| (r.task_id.clone(), r)).collect();
            for task in tasks {
                match by_id.remove(&task.id) {
                    Some(r) if r.success => {
                        node.record_success();
                        shared.metrics.record_task_completed(r.processing_time().as_secs_f64() * 1000.0);
                    }
                    Some(_) => {
                        node.record_error();
                        retry_or_fail(shared, task, "task executor reported failure");
                    }
                    None => {
                        node.record_error();
                        retry_or_fail(shared, task, "worker returned no result for this task");
                    }
                }
            }
        }
        Err(e) => {
            shared.balancer.update_metrics(&node.id, elapsed, false);
            node.record_error();
            warn!(node = %node.id, error = %e, "batch dispatch failed");
            if shared.config.enable_failover && node.status() == NodeStatus::Offline {
                warn!(node = %node.id, "node offline, failing batch over to another node on retry");
            }
            for task in tasks {
                retry_or_fail(shared, task, &e.to_string());
            }
        }
    }
}

fn retry_or_fail(shared: &Arc<Shared>, task: Task, reason: &str) {
    if task.attempts < shared.config.max_retries {
        shared.metrics.record_task_retried();
        let _ = shared.retry_tx.send(task.retried());
    } else {
        shared.metrics.record_task_failed();
        warn!(task_id = %task.id, reason, "task failed terminally after exhausting retries");
    }
}

fn requeue_all(shared: &Arc<Shared>, tasks: Vec<Task>, reason: &str) {
    for task in tasks {
        retry_or_fail(shared, task, reason);
    }
}
