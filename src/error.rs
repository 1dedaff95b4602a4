//! Error taxonomy for the coordinator and worker.
//!
//! Variants are grouped by how the dispatch loop must react to them
//! (transient/retryable, invalid/terminal, resource, fatal): each error
//! knows its own retry disposition so the dispatch loop calls a method
//! instead of re-deriving the classification at every call site.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoordinatorError>;

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("node already registered: {0}")]
    NodeAlreadyExists(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("invalid node capacity: {0}")]
    InvalidCapacity(i64),

    #[error("coordinator queue is full")]
    QueueFull,

    #[error("unknown partition strategy: {0}")]
    UnknownPartitionStrategy(String),

    #[error("unknown load balance strategy: {0}")]
    UnknownBalanceStrategy(String),

    #[error("transport error talking to node {node}: {source}")]
    Transport {
        node: String,
        #[source]
        source: TransportError,
    },

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("shutdown did not complete within the timeout; transports were closed anyway")]
    ShutdownTimedOut,

    #[error("coordinator is shut down")]
    ShutDown,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoordinatorError {
    /// Transient failures are retried by the dispatch loop up to `max_retries`.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoordinatorError::Transport { .. } | CoordinatorError::Timeout(_) | CoordinatorError::QueueFull
        )
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request error: {0}")]
    Request(String),

    #[error("non-success status: {0}")]
    Status(u16),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("timed out")]
    TimedOut,
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("worker queue is full")]
    QueueFull,

    #[error("unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("malformed task payload: {0}")]
    MalformedPayload(String),

    #[error("task deadline exceeded")]
    DeadlineExceeded,

    #[error("executor failed: {0}")]
    ExecutionFailed(String),

    #[error("worker is shutting down")]
    ShuttingDown,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WorkerError {
    pub fn is_retryable_by_caller(&self) -> bool {
        matches!(self, WorkerError::QueueFull | WorkerError::DeadlineExceeded)
    }
}
