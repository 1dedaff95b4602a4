use super::{Balancer, NodeSnapshot};
use rand::Rng;
use std::sync::Mutex;

/// Source of random indices, injectable for deterministic tests.
pub trait IndexSource: Send + Sync {
    fn next_index(&self, bound: usize) -> usize;
}

struct ThreadRngSource;

impl IndexSource for ThreadRngSource {
    fn next_index(&self, bound: usize) -> usize {
        rand::rng().random_range(0..bound)
    }
}

/// Test-only deterministic source that replays a fixed sequence.
pub struct FixedSequenceSource {
    sequence: Vec<usize>,
    pos: Mutex<usize>,
}

impl FixedSequenceSource {
    pub fn new(sequence: Vec<usize>) -> Self {
        Self {
            sequence,
            pos: Mutex::new(0),
        }
    }
}

impl IndexSource for FixedSequenceSource {
    fn next_index(&self, bound: usize) -> usize {
        let mut pos = self.pos.lock().unwrap();
        let idx = self.sequence[*pos % self.sequence.len()] % bound;
        *pos += 1;
        idx
    }
}

/// Samples two distinct indices (equal only when a single node exists)
/// and returns whichever has the lower `active/capacity`.
pub struct PowerOfTwoBalancer {
    source: Box<dyn IndexSource>,
}

impl PowerOfTwoBalancer {
    pub fn new() -> Self {
        Self {
            source: Box::new(ThreadRngSource),
        }
    }

    pub fn with_source(source: Box<dyn IndexSource>) -> Self {
        Self { source }
    }
}

impl Default for PowerOfTwoBalancer {
    fn default() -> Self {
        Self::new()
    }
}

impl Balancer for PowerOfTwoBalancer {
    fn select_node(&self, _preferred: &str, available: &[NodeSnapshot]) -> String {
        match available.len() {
            0 => String::new(),
            1 => available[0].id.clone(),
            n => {
                let i = self.source.next_index(n);
                let mut j = self.source.next_index(n);
                while j == i {
                    j = self.source.next_index(n);
                }
                let (a, b) = (&available[i], &available[j]);
                if a.load() <= b.load() {
                    a.id.clone()
                } else {
                    b.id.clone()
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "power-of-two"
    }
}
