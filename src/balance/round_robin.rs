use super::{Balancer, NodeSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct RoundRobinBalancer {
    counter: AtomicU64,
}

impl RoundRobinBalancer {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for RoundRobinBalancer {
    fn default() -> Self {
        Self::new()
    }
}

impl Balancer for RoundRobinBalancer {
    fn select_node(&self, _preferred: &str, available: &[NodeSnapshot]) -> String {
        if available.is_empty() {
            return String::new();
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let idx = (n % available.len() as u64) as usize;
        available[idx].id.clone()
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}
