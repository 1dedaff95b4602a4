use crate::error::WorkerError;
use crate::task::Task;
use tokio::sync::mpsc;

/// Bounded in-memory task queue. `try_push` never blocks: a full queue is
/// reported immediately as [`WorkerError::QueueFull`].
pub struct TaskQueue {
    tx: mpsc::Sender<Task>,
}

pub struct TaskQueueReceiver {
    rx: mpsc::Receiver<Task>,
}

impl TaskQueue {
    pub fn bounded(capacity: usize) -> (Self, TaskQueueReceiver) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, TaskQueueReceiver { rx })
    }

    pub fn try_push(&self, task: Task) -> Result<(), WorkerError> {
        self.tx.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => WorkerError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => WorkerError::ShuttingDown,
        })
    }

    pub fn depth_hint(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

impl Clone for TaskQueue {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl TaskQueueReceiver {
    pub async fn recv(&mut self) -> Option<Task> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskType;

    #[tokio::test]
    async fn push_then_recv_round_trips_a_task() {
        let (queue, mut rx) = TaskQueue::bounded(2);
        queue.try_push(Task::new("t1", TaskType::Analyze, vec![])).unwrap();
        let got = rx.recv().await.unwrap();
        assert_eq!(got.id, "t1");
    }

    #[test]
    fn full_queue_reports_queue_full() {
        let (queue, _rx) = TaskQueue::bounded(1);
        queue.try_push(Task::new("t1", TaskType::Analyze, vec![])).unwrap();
        let err = queue.try_push(Task::new("t2", TaskType::Analyze, vec![])).unwrap_err();
        assert!(matches!(err, WorkerError::QueueFull));
    }
}
