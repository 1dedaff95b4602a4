use super::{Balancer, LeastLoadedBalancer, NodeSnapshot, RoundRobinBalancer, WeightedResponseTimeBalancer};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

const EVAL_WINDOW: Duration = Duration::from_secs(30);
const FAILURE_RATE_THRESHOLD: f64 = 0.1;
const AVG_MS_THRESHOLD: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    LeastLoaded,
    WeightedResponse,
    RoundRobin,
}

struct Window {
    started_at: Instant,
    successes: u64,
    failures: u64,
    total_ms: f64,
    samples: u64,
}

impl Window {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            successes: 0,
            failures: 0,
            total_ms: 0.0,
            samples: 0,
        }
    }

    fn failure_rate(&self) -> f64 {
        let total = self.successes + self.failures;
        if total == 0 {
            0.0
        } else {
            self.failures as f64 / total as f64
        }
    }

    fn avg_ms(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.total_ms / self.samples as f64
        }
    }
}

struct AdaptiveState {
    strategy: Strategy,
    window: Window,
}

/// Wraps least-loaded, weighted-response-time and round-robin; every 30s
/// tumbling window it re-evaluates measured failure rate and average
/// latency and switches strategy. The window resets on every evaluation
/// (a deliberate design decision: the failure-rate input is always over
/// the last 30s, not a longer rolling memory).
pub struct AdaptiveBalancer {
    least_loaded: LeastLoadedBalancer,
    weighted: WeightedResponseTimeBalancer,
    round_robin: RoundRobinBalancer,
    state: Mutex<AdaptiveState>,
}

impl AdaptiveBalancer {
    pub fn new() -> Self {
        Self {
            least_loaded: LeastLoadedBalancer::new(),
            weighted: WeightedResponseTimeBalancer::new(),
            round_robin: RoundRobinBalancer::new(),
            state: Mutex::new(AdaptiveState {
                strategy: Strategy::LeastLoaded,
                window: Window::new(),
            }),
        }
    }

    /// Current strategy name, for observability / tests.
    pub fn current_strategy(&self) -> &'static str {
        match self.state.lock().strategy {
            Strategy::LeastLoaded => "least-loaded",
            Strategy::WeightedResponse => "weighted-response",
            Strategy::RoundRobin => "round-robin",
        }
    }

    fn maybe_evaluate(&self) {
        let mut state = self.state.lock();
        if state.window.started_at.elapsed() < EVAL_WINDOW {
            return;
        }
        let failure_rate = state.window.failure_rate();
        let avg_ms = state.window.avg_ms();
        state.strategy = if failure_rate > FAILURE_RATE_THRESHOLD {
            Strategy::RoundRobin
        } else if avg_ms > AVG_MS_THRESHOLD {
            Strategy::WeightedResponse
        } else {
            Strategy::LeastLoaded
        };
        state.window = Window::new();
    }

    /// Test/operational hook: force an evaluation regardless of elapsed
    /// time, using the window accumulated so far.
    pub fn force_evaluate(&self) {
        let mut state = self.state.lock();
        let failure_rate = state.window.failure_rate();
        let avg_ms = state.window.avg_ms();
        state.strategy = if failure_rate > FAILURE_RATE_THRESHOLD {
            Strategy::RoundRobin
        } else if avg_ms > AVG_MS_THRESHOLD {
            Strategy::WeightedResponse
        } else {
            Strategy::LeastLoaded
        };
        state.window = Window::new();
    }
}

impl Default for AdaptiveBalancer {
    fn default() -> Self {
        Self::new()
    }
}

impl Balancer for AdaptiveBalancer {
    fn select_node(&self, preferred: &str, available: &[NodeSnapshot]) -> String {
        self.maybe_evaluate();
        let strategy = self.state.lock().strategy;
        match strategy {
            Strategy::LeastLoaded => self.least_loaded.select_node(preferred, available),
            Strategy::WeightedResponse => self.weighted.select_node(preferred, available),
            Strategy::RoundRobin => self.round_robin.select_node(preferred, available),
        }
    }

    fn update_metrics(&self, node_id: &str, duration: Duration, success: bool) {
        self.weighted.update_metrics(node_id, duration, success);
        let mut state = self.state.lock();
        if success {
            state.window.successes += 1;
        } else {
            state.window.failures += 1;
        }
        state.window.total_ms += duration.as_secs_f64() * 1000.0;
        state.window.samples += 1;
    }

    fn name(&self) -> &'static str {
        "adaptive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::NodeStatus;

    fn nodes(ids: &[&str]) -> Vec<NodeSnapshot> {
        ids.iter()
            .map(|id| NodeSnapshot {
                id: id.to_string(),
                active_tasks: 0,
                capacity: 10,
                status: NodeStatus::Healthy,
            })
            .collect()
    }

    #[test]
    fn starts_in_least_loaded_mode() {
        let b = AdaptiveBalancer::new();
        assert_eq!(b.current_strategy(), "least-loaded");
    }

    #[test]
    fn high_failure_rate_switches_to_round_robin() {
        let b = AdaptiveBalancer::new();
        for _ in 0..3 {
            b.update_metrics("n1", Duration::from_millis(10), false);
        }
        b.update_metrics("n1", Duration::from_millis(10), true);
        b.force_evaluate();
        assert_eq!(b.current_strategy(), "round-robin");
    }

    #[test]
    fn high_latency_with_low_failures_switches_to_weighted_response() {
        let b = AdaptiveBalancer::new();
        for _ in 0..5 {
            b.update_metrics("n1", Duration::from_millis(250), true);
        }
        b.force_evaluate();
        assert_eq!(b.current_strategy(), "weighted-response");
    }

    #[test]
    fn evaluation_resets_the_window() {
        let b = AdaptiveBalancer::new();
        for _ in 0..3 {
            b.update_metrics("n1", Duration::from_millis(10), false);
        }
        b.force_evaluate();
        assert_eq!(b.current_strategy(), "round-robin");
        // nothing fed in since reset: a second evaluation reverts to least-loaded
        b.force_evaluate();
        assert_eq!(b.current_strategy(), "least-loaded");
    }

    #[test]
    fn delegates_selection_to_the_active_strategy() {
        let b = AdaptiveBalancer::new();
        let ns = nodes(&["n1", "n2"]);
        let picked = b.select_node("", &ns);
        assert!(picked == "n1" || picked == "n2");
    }
}
