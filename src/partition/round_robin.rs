use super::Partitioner;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct RoundRobinPartitioner {
    counter: AtomicU64,
}

impl RoundRobinPartitioner {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for RoundRobinPartitioner {
    fn default() -> Self {
        Self::new()
    }
}

impl Partitioner for RoundRobinPartitioner {
    fn get_node(&self, _key: &str, available: &[String]) -> String {
        if available.is_empty() {
            return String::new();
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let idx = ((n - 1) % available.len() as u64) as usize;
        available[idx].clone()
    }

    fn name(&self) -> &'static str {
        "round-robin"
    }
}
