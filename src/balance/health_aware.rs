use super::{Balancer, NodeSnapshot, NodeStatus};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

const MIN_HEALTH_SCORE: f64 = 0.3;
const SUCCESS_BOOST: f64 = 1.05;
const FAILURE_PENALTY: f64 = 0.9;

/// Wraps a base balancer, pre-filtering to nodes that are Healthy or
/// Degraded AND whose tracked health score is above 0.3. Falls through to
/// the unfiltered list if that leaves nothing. The health score here is
/// this balancer's own running feedback signal, not `HealthStatus`'s
/// informational `cpu_usage`/`memory_usage` gauges, which no balancer reads.
pub struct HealthAwareBalancer {
    base: Box<dyn Balancer>,
    scores: RwLock<HashMap<String, f64>>,
}

impl HealthAwareBalancer {
    pub fn new(base: Box<dyn Balancer>) -> Self {
        Self {
            base,
            scores: RwLock::new(HashMap::new()),
        }
    }

    fn score_of(&self, node_id: &str) -> f64 {
        *self.scores.read().get(node_id).unwrap_or(&1.0)
    }

    fn is_viable(&self, n: &NodeSnapshot) -> bool {
        matches!(n.status, NodeStatus::Healthy | NodeStatus::Degraded) && self.score_of(&n.id) > MIN_HEALTH_SCORE
    }
}

impl Balancer for HealthAwareBalancer {
    fn select_node(&self, preferred: &str, available: &[NodeSnapshot]) -> String {
        let filtered: Vec<NodeSnapshot> = available.iter().filter(|n| self.is_viable(n)).cloned().collect();
        if filtered.is_empty() {
            self.base.select_node(preferred, available)
        } else {
            self.base.select_node(preferred, &filtered)
        }
    }

    fn update_metrics(&self, node_id: &str, duration: Duration, success: bool) {
        self.base.update_metrics(node_id, duration, success);
        let mut scores = self.scores.write();
        let score = scores.entry(node_id.to_string()).or_insert(1.0);
        if success {
            *score = (*score * SUCCESS_BOOST).min(1.0);
        } else {
            *score *= FAILURE_PENALTY;
        }
    }

    fn name(&self) -> &'static str {
        "health-aware"
    }
}
