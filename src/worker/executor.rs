use super::health::WorkerHealth;
use super::queue::TaskQueueReceiver;
use super::task_exec::ExecutorRegistry;
use crate::task::{Task, TaskResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Drains the queue with exactly `max_concurrent` tasks in flight at a
/// time, enforcing a per-task deadline and feeding [`WorkerHealth`]. Also
/// used directly by the batch HTTP handler, which bypasses the queue but
/// shares the same concurrency limit and per-task execution path.
pub struct ExecutorPool {
    registry: Arc<ExecutorRegistry>,
    health: Arc<WorkerHealth>,
    semaphore: Arc<Semaphore>,
    process_timeout: Duration,
}

impl ExecutorPool {
    pub fn new(registry: Arc<ExecutorRegistry>, health: Arc<WorkerHealth>, max_concurrent: usize, process_timeout: Duration) -> Self {
        Self {
            registry,
            health,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            process_timeout,
        }
    }

    /// Runs until the queue's sender side is dropped (worker shutdown).
    /// Results from this path are not returned to any caller; they are
    /// logged, matching `submit_one`'s fire-and-forget contract.
    pub async fn run(self: Arc<Self>, mut rx: TaskQueueReceiver) {
        while let Some(task) = rx.recv().await {
            let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };
            let pool = Arc::clone(&self);
            tokio::spawn(async move {
                let _permit = permit;
                let result = pool.execute_one(&task).await;
                debug!(task_id = %task.id, success = result.success, "queued task completed");
            });
        }
    }

    /// Executes a single task under the shared semaphore and per-task
    /// deadline, updating health counters. Used both by the queue drain
    /// loop and by the synchronous batch handler.
    #[tracing::instrument(skip(self, task), fields(task_id = %task.id, task_type = task.task_type.as_str()))]
    pub async fn execute_one(&self, task: &Task) -> TaskResult {
        self.health.task_started();
        let started = Instant::now();
        let executor = self.registry.get(task.task_type);
        let result = match executor {
            Some(exec) => match tokio::time::timeout(self.process_timeout, exec.execute(&task.data)).await {
                Ok(Ok(data)) => TaskResult::success(task.id.clone(), data, started.elapsed()),
                Ok(Err(e)) => {
                    warn!(task_id = %task.id, error = %e, "task execution failed");
                    TaskResult::failure(task.id.clone(), e.to_string(), started.elapsed())
                }
                Err(_) => {
                    warn!(task_id = %task.id, "task deadline exceeded");
                    TaskResult::failure(task.id.clone(), "deadline_exceeded", started.elapsed())
                }
            },
            None => TaskResult::failure(
                task.id.clone(),
                format!("unknown task type: {}", task.task_type.as_str()),
                started.elapsed(),
            ),
        };
        self.health.task_finished(result.success);
        result
    }

    /// Executes a batch concurrently, each task bound by the shared
    /// semaphore so at most `max_concurrent` run at once.
    #[tracing::instrument(skip(self, tasks), fields(batch_size = tasks.len()))]
    pub async fn execute_batch(self: &Arc<Self>, tasks: &[Task]) -> Vec<TaskResult> {
        let futures = tasks.iter().map(|task| {
            let pool = Arc::clone(self);
            let task = task.clone();
            async move {
                let _permit = pool.semaphore.acquire().await;
                pool.execute_one(&task).await
            }
        });
        futures::future::join_all(futures).await
    }
}
