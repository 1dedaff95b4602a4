//! Balancers choose the *actual* target node from the available set,
//! optionally biased by the partitioner's preferred hint.

mod adaptive;
mod health_aware;
mod least_loaded;
mod power_of_two;
mod round_robin;
mod weighted_response_time;

pub use adaptive::AdaptiveBalancer;
pub use health_aware::HealthAwareBalancer;
pub use least_loaded::LeastLoadedBalancer;
pub use power_of_two::PowerOfTwoBalancer;
pub use round_robin::RoundRobinBalancer;
pub use weighted_response_time::WeightedResponseTimeBalancer;

use crate::error::CoordinatorError;
use std::time::Duration;

/// A node's instantaneous load/health inputs, as seen by a balancer.
/// Balancers never touch the registry directly; the coordinator snapshots
/// this view before calling `select_node`.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub id: String,
    pub active_tasks: u32,
    pub capacity: u32,
    pub status: NodeStatus,
}

impl NodeSnapshot {
    pub fn load(&self) -> f64 {
        if self.capacity == 0 {
            return 1.0;
        }
        self.active_tasks as f64 / self.capacity as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Offline,
}

/// Common contract. `available` empty => return `""`.
pub trait Balancer: Send + Sync {
    fn select_node(&self, preferred: &str, available: &[NodeSnapshot]) -> String;

    /// Feed back the outcome of a dispatched call so latency/health-aware
    /// strategies can adapt. No-op for strategies that need no feedback.
    fn update_metrics(&self, _node_id: &str, _duration: Duration, _success: bool) {}

    fn name(&self) -> &'static str;
}

pub fn build(strategy: &str) -> Result<Box<dyn Balancer>, CoordinatorError> {
    match strategy {
        "least-loaded" => Ok(Box::new(LeastLoadedBalancer::new())),
        "weighted-response" => Ok(Box::new(WeightedResponseTimeBalancer::new())),
        "round-robin" => Ok(Box::new(RoundRobinBalancer::new())),
        "power-of-two" => Ok(Box::new(PowerOfTwoBalancer::new())),
        "adaptive" => Ok(Box::new(AdaptiveBalancer::new())),
        other => Err(CoordinatorError::UnknownBalanceStrategy(other.to_string())),
    }
}

#[cfg(test)]
mod build_tests {
    use super::*;

    #[test]
    fn rejects_unknown_strategy_at_construction() {
        let err = build("magic").unwrap_err();
        assert!(matches!(err, CoordinatorError::UnknownBalanceStrategy(_)));
    }

    #[test]
    fn accepts_all_documented_strategies() {
        for s in ["least-loaded", "weighted-response", "round-robin", "power-of-two", "adaptive"] {
            assert!(build(s).is_ok(), "strategy {s} should build");
        }
    }
}
