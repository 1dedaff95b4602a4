//! Coordinator and worker configuration, with defaults matching the
//! numeric thresholds baked into the dispatch/health logic and a JSON
//! loader for the common "read config file, override scalars from env"
//! shape.

use crate::error::{CoordinatorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn duration_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

fn duration_secs_ser<S>(d: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(d.as_secs())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub min_nodes: usize,
    pub max_nodes: usize,
    #[serde(serialize_with = "duration_secs_ser", deserialize_with = "duration_secs")]
    pub node_timeout: Duration,
    #[serde(serialize_with = "duration_secs_ser", deserialize_with = "duration_secs")]
    pub health_check_interval: Duration,
    pub queue_size: usize,
    pub batch_size: usize,
    #[serde(serialize_with = "duration_secs_ser", deserialize_with = "duration_secs")]
    pub batch_timeout: Duration,
    pub max_retries: u32,
    pub partition_strategy: String,
    pub load_balance_strategy: String,
    pub enable_failover: bool,
    #[serde(serialize_with = "duration_secs_ser", deserialize_with = "duration_secs")]
    pub failover_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            min_nodes: 1,
            max_nodes: 64,
            node_timeout: Duration::from_secs(30),
            health_check_interval: Duration::from_secs(5),
            queue_size: 1024,
            batch_size: 32,
            batch_timeout: Duration::from_secs(300),
            max_retries: 3,
            partition_strategy: "consistent-hash".to_string(),
            load_balance_strategy: "least-loaded".to_string(),
            enable_failover: true,
            failover_timeout: Duration::from_secs(30),
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_nodes == 0 {
            return Err(CoordinatorError::InvalidConfig("min_nodes must be >= 1".into()));
        }
        if self.max_nodes < self.min_nodes {
            return Err(CoordinatorError::InvalidConfig("max_nodes must be >= min_nodes".into()));
        }
        if self.queue_size == 0 {
            return Err(CoordinatorError::InvalidConfig("queue_size must be >= 1".into()));
        }
        if self.batch_size == 0 {
            return Err(CoordinatorError::InvalidConfig("batch_size must be >= 1".into()));
        }
        if !matches!(
            self.partition_strategy.as_str(),
            "hash" | "consistent-hash" | "round-robin" | "weighted" | "key-affinity"
        ) {
            return Err(CoordinatorError::UnknownPartitionStrategy(self.partition_strategy.clone()));
        }
        if !matches!(
            self.load_balance_strategy.as_str(),
            "least-loaded" | "weighted-response" | "round-robin" | "power-of-two" | "adaptive"
        ) {
            return Err(CoordinatorError::UnknownBalanceStrategy(self.load_balance_strategy.clone()));
        }
        Ok(())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CoordinatorError::InvalidConfig(format!("reading {}: {e}", path.as_ref().display())))?;
        let cfg: Self = serde_json::from_str(&text)
            .map_err(|e| CoordinatorError::InvalidConfig(format!("parsing {}: {e}", path.as_ref().display())))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub id: String,
    pub listen_address: String,
    pub queue_size: usize,
    pub max_concurrent: usize,
    #[serde(serialize_with = "duration_secs_ser", deserialize_with = "duration_secs")]
    pub process_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: "worker-1".to_string(),
            listen_address: "0.0.0.0:8081".to_string(),
            queue_size: 256,
            max_concurrent: 8,
            process_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(CoordinatorError::InvalidConfig("worker id must not be empty".into()));
        }
        if self.queue_size == 0 {
            return Err(CoordinatorError::InvalidConfig("queue_size must be >= 1".into()));
        }
        if self.max_concurrent == 0 {
            return Err(CoordinatorError::InvalidConfig("max_concurrent must be >= 1".into()));
        }
        Ok(())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CoordinatorError::InvalidConfig(format!("reading {}: {e}", path.as_ref().display())))?;
        let cfg: Self = serde_json::from_str(&text)
            .map_err(|e| CoordinatorError::InvalidConfig(format!("parsing {}: {e}", path.as_ref().display())))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = CoordinatorConfig::default();
        assert_eq!(cfg.batch_timeout, Duration::from_secs(300));
        assert_eq!(cfg.health_check_interval, Duration::from_secs(5));
        assert_eq!(cfg.max_retries, 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_partition_strategy() {
        let mut cfg = CoordinatorConfig::default();
        cfg.partition_strategy = "magic".to_string();
        assert!(matches!(cfg.validate(), Err(CoordinatorError::UnknownPartitionStrategy(_))));
    }

    #[test]
    fn rejects_unknown_balance_strategy() {
        let mut cfg = CoordinatorConfig::default();
        cfg.load_balance_strategy = "magic".to_string();
        assert!(matches!(cfg.validate(), Err(CoordinatorError::UnknownBalanceStrategy(_))));
    }

    #[test]
    fn rejects_max_nodes_below_min_nodes() {
        let mut cfg = CoordinatorConfig::default();
        cfg.min_nodes = 10;
        cfg.max_nodes = 2;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn worker_config_rejects_zero_max_concurrent() {
        let mut cfg = WorkerConfig::default();
        cfg.max_concurrent = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn worker_config_defaults_are_valid() {
        assert!(WorkerConfig::default().validate().is_ok());
    }
}
