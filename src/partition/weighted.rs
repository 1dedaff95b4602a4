use super::Partitioner;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

fn hash64(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    u64::from_be_bytes(digest[0..8].try_into().unwrap())
}

/// Maps `hash(key) mod total_weight` through a running accumulator over
/// the available nodes in order; falls back to the last node if the
/// accumulator underflows (e.g. a weight isn't registered for an
/// available node).
pub struct WeightedPartitioner {
    weights: RwLock<HashMap<String, u32>>,
}

impl WeightedPartitioner {
    pub fn new() -> Self {
        Self {
            weights: RwLock::new(HashMap::new()),
        }
    }

    fn weight_of(&self, id: &str) -> u32 {
        self.weights.read().get(id).copied().unwrap_or(1).max(1)
    }
}

impl Default for WeightedPartitioner {
    fn default() -> Self {
        Self::new()
    }
}

impl Partitioner for WeightedPartitioner {
    fn get_node(&self, key: &str, available: &[String]) -> String {
        if available.is_empty() {
            return String::new();
        }
        let total: u64 = available.iter().map(|id| self.weight_of(id) as u64).sum();
        let mut target = hash64(key) % total.max(1);

        for id in available {
            let w = self.weight_of(id) as u64;
            if target < w {
                return id.clone();
            }
            target -= w;
        }
        available.last().unwrap().clone()
    }

    fn add_node(&self, id: &str, weight: u32) {
        self.weights.write().insert(id.to_string(), weight.max(1));
    }

    fn remove_node(&self, id: &str) {
        self.weights.write().remove(id);
    }

    fn name(&self) -> &'static str {
        "weighted"
    }
}
