//! Partitioners choose the *preferred* node for a task key.
//!
//! Capability interface, not inheritance: every strategy implements the
//! same small trait; wrapping strategies (key-affinity) hold a `base` by
//! field composition rather than any parent/child relationship.

mod consistent_hash;
mod hash;
mod key_affinity;
mod round_robin;
mod weighted;

pub use consistent_hash::ConsistentHashPartitioner;
pub use hash::HashPartitioner;
pub use key_affinity::KeyAffinityPartitioner;
pub use round_robin::RoundRobinPartitioner;
pub use weighted::WeightedPartitioner;

use crate::error::CoordinatorError;

/// `GetNode` must return an id present in `available`, or `""` if it is
/// empty. `Add`/`Remove` update internal membership-dependent state (the
/// hash ring, weight table, affinity map); strategies that need no such
/// state make them no-ops.
pub trait Partitioner: Send + Sync {
    fn get_node(&self, key: &str, available: &[String]) -> String;

    fn add_node(&self, _id: &str, _weight: u32) {}

    fn remove_node(&self, _id: &str) {}

    fn name(&self) -> &'static str;
}

pub fn build(strategy: &str, consistent_hash_vnodes: u32) -> Result<Box<dyn Partitioner>, CoordinatorError> {
    match strategy {
        "hash" => Ok(Box::new(HashPartitioner::new())),
        "consistent-hash" => Ok(Box::new(ConsistentHashPartitioner::new(consistent_hash_vnodes))),
        "round-robin" => Ok(Box::new(RoundRobinPartitioner::new())),
        "weighted" => Ok(Box::new(WeightedPartitioner::new())),
        "key-affinity" => Ok(Box::new(KeyAffinityPartitioner::new(Box::new(HashPartitioner::new())))),
        other => Err(CoordinatorError::UnknownPartitionStrategy(other.to_string())),
    }
}
