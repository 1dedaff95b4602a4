use super::node::WorkerNodeRecord;
use crate::balance::NodeStatus;
use crate::metrics::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Polls one node's client and derives its new [`NodeStatus`] from the
/// transition matrix: success + load/error thresholds pick
/// Healthy/Degraded/Unhealthy; an error or a timeout beyond `node_timeout`
/// marks the node Offline.
pub async fn check_node(node: &WorkerNodeRecord, node_timeout: Duration, metrics: &Metrics) -> NodeStatus {
    let check = tokio::time::timeout(node_timeout, node.client.health_check()).await;
    let new_status = match check {
        Ok(Ok(snapshot)) => {
            *node.last_heartbeat.write() = chrono::Utc::now();
            if snapshot.load_average < 0.7 && snapshot.error_rate < 0.05 {
                NodeStatus::Healthy
            } else if snapshot.load_average < 0.9 && snapshot.error_rate < 0.1 {
                NodeStatus::Degraded
            } else {
                NodeStatus::Unhealthy
            }
        }
        Ok(Err(e)) => {
            warn!(node = %node.id, error = %e, "health check transport error");
            metrics.record_health_check_failure(&node.id);
            node.record_error();
            NodeStatus::Offline
        }
        Err(_) => {
            warn!(node = %node.id, "health check timed out");
            metrics.record_health_check_failure(&node.id);
            node.record_error();
            NodeStatus::Offline
        }
    };
    node.set_status(new_status);
    new_status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockWorkerClient;

    #[tokio::test]
    async fn healthy_snapshot_marks_node_healthy() {
        let client = Arc::new(MockWorkerClient::new(Duration::from_millis(1)));
        let node = WorkerNodeRecord::new("n1", "http://x", 10, client);
        let metrics = Metrics::new();
        let status = check_node(&node, Duration::from_secs(1), &metrics).await;
        assert_eq!(status, NodeStatus::Healthy);
    }

    #[tokio::test]
    async fn failing_client_marks_node_offline_and_bumps_failure_counter() {
        let client = Arc::new(MockWorkerClient::unreachable(Duration::from_millis(1)));
        let node = WorkerNodeRecord::new("n1", "http://x", 10, client);
        let metrics = Metrics::new();
        let status = check_node(&node, Duration::from_secs(1), &metrics).await;
        assert_eq!(status, NodeStatus::Offline);
        assert_eq!(metrics.health_check_failures(), 1);
    }
}
