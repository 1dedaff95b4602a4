use super::Partitioner;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Wraps a `base` partitioner with an explicit prefix-to-node affinity
/// table, consulted first. `GetNode` picks the longest registered prefix
/// of `key` whose node is currently available; otherwise it delegates to
/// `base`. Composition by field, not inheritance.
pub struct KeyAffinityPartitioner {
    base: Box<dyn Partitioner>,
    affinity: RwLock<HashMap<String, String>>,
}

impl KeyAffinityPartitioner {
    pub fn new(base: Box<dyn Partitioner>) -> Self {
        Self {
            base,
            affinity: RwLock::new(HashMap::new()),
        }
    }

    /// Pin `prefix` to `node_id`. Not part of the common `Partitioner`
    /// contract — this is the affinity-specific control surface.
    pub fn set_affinity(&self, prefix: impl Into<String>, node_id: impl Into<String>) {
        self.affinity.write().insert(prefix.into(), node_id.into());
    }

    fn longest_prefix_match(&self, key: &str, available: &[String]) -> Option<String> {
        let table = self.affinity.read();
        table
            .iter()
            .filter(|(prefix, node)| key.starts_with(prefix.as_str()) && available.contains(node))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, node)| node.clone())
    }
}

impl Partitioner for KeyAffinityPartitioner {
    fn get_node(&self, key: &str, available: &[String]) -> String {
        if let Some(node) = self.longest_prefix_match(key, available) {
            return node;
        }
        self.base.get_node(key, available)
    }

    fn add_node(&self, id: &str, weight: u32) {
        self.base.add_node(id, weight);
    }

    fn remove_node(&self, id: &str) {
        self.base.remove_node(id);
        self.affinity.write().retain(|_, node| node != id);
    }

    fn name(&self) -> &'static str {
        "key-affinity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::HashPartitioner;

    #[test]
    fn longest_matching_prefix_wins() {
        let p = KeyAffinityPartitioner::new(Box::new(HashPartitioner::new()));
        p.set_affinity("order-", "n1");
        p.set_affinity("order-vip-", "n2");
        let avail = vec!["n1".to_string(), "n2".to_string()];
        assert_eq!(p.get_node("order-vip-42", &avail), "n2");
        assert_eq!(p.get_node("order-7", &avail), "n1");
    }

    #[test]
    fn falls_back_to_base_without_affinity_match() {
        let p = KeyAffinityPartitioner::new(Box::new(HashPartitioner::new()));
        let avail = vec!["n1".to_string()];
        assert_eq!(p.get_node("anything", &avail), "n1");
    }

    #[test]
    fn remove_node_purges_affinity_entries_pointing_at_it() {
        let p = KeyAffinityPartitioner::new(Box::new(HashPartitioner::new()));
        p.set_affinity("order-", "n1");
        p.remove_node("n1");
        let avail = vec!["n1".to_string()];
        // n1 affinity entry purged, so lookup falls through to base hash
        assert_eq!(p.get_node("order-1", &avail), "n1");
        assert!(p.affinity.read().is_empty());
    }
}
