//! Fixed-capacity ring buffer of recent response times.
//!
//! Not internally synchronized; callers serialize access (the node record
//! that owns a tracker is only ever touched under the registry's lock).

use std::time::Duration;

pub struct ResponseTimeTracker {
    samples: Vec<Duration>,
    capacity: usize,
    pos: usize,
    count: usize,
}

impl ResponseTimeTracker {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: vec![Duration::ZERO; capacity],
            capacity,
            pos: 0,
            count: 0,
        }
    }

    pub fn record(&mut self, d: Duration) {
        self.samples[self.pos] = d;
        self.pos = (self.pos + 1) % self.capacity;
        if self.count < self.capacity {
            self.count += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn average(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let total: Duration = self.samples[..self.count].iter().sum();
        total / self.count as u32
    }

    pub fn average_ms(&self) -> f64 {
        self.average().as_secs_f64() * 1000.0
    }

    /// `p` in `[0, 100]`. Sorts a copy of the valid prefix.
    pub fn percentile(&self, p: f64) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let mut sorted: Vec<Duration> = self.samples[..self.count].to_vec();
        sorted.sort_unstable();
        let idx = (((self.count - 1) as f64) * p / 100.0).floor() as usize;
        sorted[idx.min(self.count - 1)]
    }
}
