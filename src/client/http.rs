use super::{HealthSnapshot, WorkerClient};
use crate::error::{CoordinatorError, Result, TransportError};
use crate::task::{Task, TaskResult};
use async_trait::async_trait;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// POSTs task batches to a worker's `/batch` endpoint and polls `/health`.
/// Reuses one [`reqwest::Client`] (and its connection pool) for the
/// lifetime of the node registration.
pub struct HttpWorkerClient {
    base_url: String,
    node_id: String,
    http: reqwest::Client,
}

impl HttpWorkerClient {
    pub fn new(node_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self::with_timeout(node_id, address, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(node_id: impl Into<String>, address: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client configuration is static and known-valid");
        Self {
            base_url: address.into(),
            node_id: node_id.into(),
            http,
        }
    }

    fn transport_err(&self, source: TransportError) -> CoordinatorError {
        CoordinatorError::Transport {
            node: self.node_id.clone(),
            source,
        }
    }
}

#[async_trait]
impl WorkerClient for HttpWorkerClient {
    async fn process_batch(&self, tasks: &[Task]) -> Result<Vec<TaskResult>> {
        let url = format!("{}/batch", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(tasks)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.transport_err(TransportError::TimedOut)
                } else {
                    self.transport_err(TransportError::Request(e.to_string()))
                }
            })?;

        if resp.status() == reqwest::StatusCode::REQUEST_TIMEOUT {
            return Err(self.transport_err(TransportError::TimedOut));
        }
        if !resp.status().is_success() {
            return Err(self.transport_err(TransportError::Status(resp.status().as_u16())));
        }
        resp.json::<Vec<TaskResult>>()
            .await
            .map_err(|e| self.transport_err(TransportError::Decode(e.to_string())))
    }

    async fn health_check(&self) -> Result<HealthSnapshot> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.transport_err(TransportError::TimedOut)
                } else {
                    self.transport_err(TransportError::Request(e.to_string()))
                }
            })?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK && status != reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(self.transport_err(TransportError::Status(status.as_u16())));
        }
        resp.json::<HealthSnapshot>()
            .await
            .map_err(|e| self.transport_err(TransportError::Decode(e.to_string())))
    }

    async fn close(&self) {
        // reqwest::Client has no explicit close; dropping the handle releases
        // pooled connections once the last clone goes away.
    }
}
