use super::Partitioner;
use sha2::{Digest, Sha256};

/// Stateless hash partitioner: `available[SHA256(key)[0..8] mod len]`.
pub struct HashPartitioner;

impl HashPartitioner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HashPartitioner {
    fn default() -> Self {
        Self::new()
    }
}

fn hash_prefix(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    u64::from_be_bytes(digest[0..8].try_into().unwrap())
}

impl Partitioner for HashPartitioner {
    fn get_node(&self, key: &str, available: &[String]) -> String {
        if available.is_empty() {
            return String::new();
        }
        let idx = (hash_prefix(key) % available.len() as u64) as usize;
        available[idx].clone()
    }

    fn name(&self) -> &'static str {
        "hash"
    }
}
