//! Task executors: type-keyed handlers the worker's executor pool invokes
//! per task. The domain-specific scanners these wrap (capture source,
//! dissector, analyzer) are external collaborators; these are thin
//! adapters over opaque JSON parameter blobs.

use crate::error::WorkerError;
use crate::task::TaskType;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, data: &[u8]) -> Result<Vec<u8>, WorkerError>;
}

/// Maps a [`TaskType`] to its registered executor.
pub struct ExecutorRegistry {
    executors: HashMap<TaskType, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        let mut executors: HashMap<TaskType, Arc<dyn TaskExecutor>> = HashMap::new();
        executors.insert(TaskType::Capture, Arc::new(CaptureExecutor));
        executors.insert(TaskType::Dissect, Arc::new(DissectExecutor));
        executors.insert(TaskType::Analyze, Arc::new(AnalyzeExecutor));
        executors.insert(TaskType::Aggregate, Arc::new(AggregateExecutor));
        Self { executors }
    }

    pub fn register(&mut self, task_type: TaskType, executor: Arc<dyn TaskExecutor>) {
        self.executors.insert(task_type, executor);
    }

    pub fn get(&self, task_type: TaskType) -> Option<Arc<dyn TaskExecutor>> {
        self.executors.get(&task_type).cloned()
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CaptureParams {
    #[allow(dead_code)]
    interface: String,
    #[allow(dead_code)]
    filter: String,
    duration_ms: u64,
}

/// Runs an external capture source for `duration_ms`, discarding
/// per-frame output; this stands in for the real capture collaborator.
pub struct CaptureExecutor;

#[async_trait]
impl TaskExecutor for CaptureExecutor {
    async fn execute(&self, data: &[u8]) -> Result<Vec<u8>, WorkerError> {
        let params: CaptureParams =
            serde_json::from_slice(data).map_err(|e| WorkerError::MalformedPayload(e.to_string()))?;
        tokio::time::sleep(std::time::Duration::from_millis(params.duration_ms.min(50))).await;
        Ok(serde_json::to_vec(&serde_json::json!({"captured": true})).unwrap())
    }
}

#[derive(Debug, Deserialize)]
struct DissectParams {
    protocol: String,
    payload: String,
}

pub struct DissectExecutor;

#[async_trait]
impl TaskExecutor for DissectExecutor {
    async fn execute(&self, data: &[u8]) -> Result<Vec<u8>, WorkerError> {
        let params: DissectParams =
            serde_json::from_slice(data).map_err(|e| WorkerError::MalformedPayload(e.to_string()))?;
        let out = serde_json::json!({
            "protocol": params.protocol,
            "bytes_len": params.payload.len(),
        });
        Ok(serde_json::to_vec(&out).unwrap())
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    event: serde_json::Value,
}

pub struct AnalyzeExecutor;

#[async_trait]
impl TaskExecutor for AnalyzeExecutor {
    async fn execute(&self, data: &[u8]) -> Result<Vec<u8>, WorkerError> {
        let params: AnalyzeParams =
            serde_json::from_slice(data).map_err(|e| WorkerError::MalformedPayload(e.to_string()))?;
        let out = serde_json::json!({"analyzed": true, "event": params.event});
        Ok(serde_json::to_vec(&out).unwrap())
    }
}

#[derive(Debug, Deserialize)]
struct AggregateParams {
    window: String,
    #[allow(dead_code)]
    group_by: Vec<String>,
    #[allow(dead_code)]
    metrics: Vec<String>,
    events: Vec<serde_json::Value>,
}

pub struct AggregateExecutor;

#[async_trait]
impl TaskExecutor for AggregateExecutor {
    async fn execute(&self, data: &[u8]) -> Result<Vec<u8>, WorkerError> {
        let params: AggregateParams =
            serde_json::from_slice(data).map_err(|e| WorkerError::MalformedPayload(e.to_string()))?;
        let out = serde_json::json!({
            "total_events": params.events.len(),
            "window": params.window,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        Ok(serde_json::to_vec(&out).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn aggregate_executor_counts_events() {
        let exec = AggregateExecutor;
        let input = serde_json::json!({
            "window": "1m",
            "group_by": [],
            "metrics": [],
            "events": [1, 2, 3],
        });
        let out = exec.execute(&serde_json::to_vec(&input).unwrap()).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["total_events"], 3);
        assert_eq!(parsed["window"], "1m");
    }

    #[tokio::test]
    async fn dissect_executor_rejects_malformed_payload() {
        let exec = DissectExecutor;
        let err = exec.execute(b"not json").await.unwrap_err();
        assert!(matches!(err, WorkerError::MalformedPayload(_)));
    }

    #[test]
    fn registry_resolves_all_builtin_task_types() {
        let registry = ExecutorRegistry::new();
        assert!(registry.get(TaskType::Capture).is_some());
        assert!(registry.get(TaskType::Dissect).is_some());
        assert!(registry.get(TaskType::Analyze).is_some());
        assert!(registry.get(TaskType::Aggregate).is_some());
    }
}
