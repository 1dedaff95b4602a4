use super::{HealthSnapshot, WorkerClient};
use crate::error::{CoordinatorError, Result, TransportError};
use crate::task::{Task, TaskResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// Synthetic worker client for tests. Two independent failure modes:
/// `fail_tasks` makes every dispatched task come back as a logical
/// failure (transport succeeds, executor didn't); `unreachable` makes the
/// transport itself fail, as if the node had dropped off the network.
pub struct MockWorkerClient {
    per_task_duration: Duration,
    fail_tasks: Mutex<bool>,
    unreachable: Mutex<bool>,
    calls: Mutex<u32>,
}

impl MockWorkerClient {
    pub fn new(per_task_duration: Duration) -> Self {
        Self {
            per_task_duration,
            fail_tasks: Mutex::new(false),
            unreachable: Mutex::new(false),
            calls: Mutex::new(0),
        }
    }

    pub fn always_failing(per_task_duration: Duration) -> Self {
        Self {
            per_task_duration,
            fail_tasks: Mutex::new(true),
            unreachable: Mutex::new(false),
            calls: Mutex::new(0),
        }
    }

    pub fn unreachable(per_task_duration: Duration) -> Self {
        Self {
            per_task_duration,
            fail_tasks: Mutex::new(false),
            unreachable: Mutex::new(true),
            calls: Mutex::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail_tasks.lock() = failing;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock() = unreachable;
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock()
    }
}

#[async_trait]
impl WorkerClient for MockWorkerClient {
    async fn process_batch(&self, tasks: &[Task]) -> Result<Vec<TaskResult>> {
        *self.calls.lock() += 1;
        if *self.unreachable.lock() {
            return Err(CoordinatorError::Transport {
                node: "mock".to_string(),
                source: TransportError::TimedOut,
            });
        }
        if *self.fail_tasks.lock() {
            return Ok(tasks
                .iter()
                .map(|t| TaskResult::failure(t.id.clone(), "synthetic failure", self.per_task_duration))
                .collect());
        }
        Ok(tasks
            .iter()
            .map(|t| TaskResult::success(t.id.clone(), Vec::new(), self.per_task_duration))
            .collect())
    }

    async fn health_check(&self) -> Result<HealthSnapshot> {
        if *self.unreachable.lock() {
            return Err(CoordinatorError::Transport {
                node: "mock".to_string(),
                source: TransportError::TimedOut,
            });
        }
        Ok(HealthSnapshot {
            healthy: !*self.fail_tasks.lock(),
            load_average: if *self.fail_tasks.lock() { 0.95 } else { 0.1 },
            error_rate: if *self.fail_tasks.lock() { 1.0 } else { 0.0 },
            queue_depth: 0,
            memory_usage: 0.0,
            cpu_usage: 0.0,
            last_heartbeat: chrono::Utc::now(),
        })
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_successful_results_by_default() {
        let client = MockWorkerClient::new(Duration::from_millis(5));
        let tasks = vec![Task::new("t1", crate::task::TaskType::Analyze, vec![])];
        let results = client.process_batch(&tasks).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].success);
    }

    #[tokio::test]
    async fn always_failing_client_returns_failure_results_not_an_error() {
        let client = MockWorkerClient::always_failing(Duration::from_millis(5));
        let tasks = vec![Task::new("t1", crate::task::TaskType::Analyze, vec![])];
        let results = client.process_batch(&tasks).await.unwrap();
        assert!(!results[0].success);
    }

    #[tokio::test]
    async fn unreachable_client_returns_a_transport_error() {
        let client = MockWorkerClient::unreachable(Duration::from_millis(5));
        let tasks = vec![Task::new("t1", crate::task::TaskType::Analyze, vec![])];
        assert!(client.process_batch(&tasks).await.is_err());
        assert!(client.health_check().await.is_err());
    }
}
