use super::node::WorkerNodeRecord;
use crate::balance::NodeSnapshot;
use crate::client::WorkerClient;
use crate::error::{CoordinatorError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Node membership. Guarded by a single reader/writer lock: lookups take
/// the read side, registration/removal take the write side.
pub struct NodeRegistry {
    nodes: RwLock<HashMap<String, Arc<WorkerNodeRecord>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, id: &str, address: &str, capacity: u32, client: Arc<dyn WorkerClient>) -> Result<Arc<WorkerNodeRecord>> {
        if capacity < 1 {
            return Err(CoordinatorError::InvalidCapacity(capacity as i64));
        }
        let mut nodes = self.nodes.write();
        if nodes.contains_key(id) {
            return Err(CoordinatorError::NodeAlreadyExists(id.to_string()));
        }
        let record = Arc::new(WorkerNodeRecord::new(id, address, capacity, client));
        nodes.insert(id.to_string(), Arc::clone(&record));
        Ok(record)
    }

    pub fn unregister(&self, id: &str) -> Result<Arc<WorkerNodeRecord>> {
        self.nodes
            .write()
            .remove(id)
            .ok_or_else(|| CoordinatorError::NodeNotFound(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<Arc<WorkerNodeRecord>> {
        self.nodes.read().get(id).cloned()
    }

    pub fn all(&self) -> Vec<Arc<WorkerNodeRecord>> {
        self.nodes.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Ids of nodes not currently Offline — what partitioners/balancers see.
    pub fn available_ids(&self) -> Vec<String> {
        self.nodes
            .read()
            .values()
            .filter(|n| n.is_available())
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn available_snapshots(&self) -> Vec<NodeSnapshot> {
        self.nodes
            .read()
            .values()
            .filter(|n| n.is_available())
            .map(|n| n.snapshot())
            .collect()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
