use super::{Balancer, NodeSnapshot};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const EWMA_ALPHA: f64 = 0.2;
const RECENCY_WINDOW: Duration = Duration::from_secs(30);
const RECENCY_BOOST: f64 = 1.1;

struct NodeStats {
    avg_ms: f64,
    successes: u64,
    failures: u64,
    last_update: Instant,
}

/// score(node) = 1 / (avg_ms * (1+failure_rate) * (1+load)); unseen nodes
/// score 1.0; a response within the last 30s gets a 1.1x recency boost.
/// Argmax wins. Metrics are an EWMA of latency plus a failure counter.
pub struct WeightedResponseTimeBalancer {
    stats: RwLock<HashMap<String, NodeStats>>,
}

impl WeightedResponseTimeBalancer {
    pub fn new() -> Self {
        Self {
            stats: RwLock::new(HashMap::new()),
        }
    }

    fn score(&self, node: &NodeSnapshot) -> f64 {
        let stats = self.stats.read();
        let Some(s) = stats.get(&node.id) else {
            return 1.0;
        };
        let failure_rate = if s.successes + s.failures == 0 {
            0.0
        } else {
            s.failures as f64 / (s.successes + s.failures) as f64
        };
        let avg_ms = s.avg_ms.max(0.001);
        let mut score = 1.0 / (avg_ms * (1.0 + failure_rate) * (1.0 + node.load()));
        if s.last_update.elapsed() < RECENCY_WINDOW {
            score *= RECENCY_BOOST;
        }
        score
    }
}

impl Default for WeightedResponseTimeBalancer {
    fn default() -> Self {
        Self::new()
    }
}

impl Balancer for WeightedResponseTimeBalancer {
    fn select_node(&self, _preferred: &str, available: &[NodeSnapshot]) -> String {
        if available.is_empty() {
            return String::new();
        }
        available
            .iter()
            .max_by(|a, b| self.score(a).partial_cmp(&self.score(b)).unwrap())
            .map(|n| n.id.clone())
            .unwrap_or_default()
    }

    fn update_metrics(&self, node_id: &str, duration: Duration, success: bool) {
        let mut stats = self.stats.write();
        let entry = stats.entry(node_id.to_string()).or_insert_with(|| NodeStats {
            avg_ms: duration.as_secs_f64() * 1000.0,
            successes: 0,
            failures: 0,
            last_update: Instant::now(),
        });
        let sample_ms = duration.as_secs_f64() * 1000.0;
        entry.avg_ms = EWMA_ALPHA * sample_ms + (1.0 - EWMA_ALPHA) * entry.avg_ms;
        if success {
            entry.successes += 1;
        } else {
            entry.failures += 1;
        }
        entry.last_update = Instant::now();
    }

    fn name(&self) -> &'static str {
        "weighted-response"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::NodeStatus;

    fn node(id: &str) -> NodeSnapshot {
        NodeSnapshot {
            id: id.to_string(),
            active_tasks: 0,
            capacity: 10,
            status: NodeStatus::Healthy,
        }
    }

    #[test]
    fn nodes_with_no_history_score_equal_and_one_is_picked() {
        let b = WeightedResponseTimeBalancer::new();
        let nodes = vec![node("n1"), node("n2")];
        let picked = b.select_node("", &nodes);
        assert!(picked == "n1" || picked == "n2");
    }

    #[test]
    fn faster_node_wins_after_feedback() {
        let b = WeightedResponseTimeBalancer::new();
        b.update_metrics("slow", Duration::from_millis(500), true);
        b.update_metrics("fast", Duration::from_millis(5), true);
        let nodes = vec![node("slow"), node("fast")];
        assert_eq!(b.select_node("", &nodes), "fast");
    }

    #[test]
    fn failing_node_loses_to_reliable_node_with_similar_latency() {
        let b = WeightedResponseTimeBalancer::new();
        for _ in 0..5 {
            b.update_metrics("flaky", Duration::from_millis(20), false);
        }
        b.update_metrics("reliable", Duration::from_millis(20), true);
        let nodes = vec![node("flaky"), node("reliable")];
        assert_eq!(b.select_node("", &nodes), "reliable");
    }
}
