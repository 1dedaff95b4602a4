//! Wire-level data model: [`Task`], [`TaskType`] and [`TaskResult`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A unit of work submitted to the coordinator.
///
/// Immutable after submission except `attempts`: a retry produces a
/// logical reattempt of the same task, not a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub priority: i32,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub partition_key: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
}

impl Task {
    pub fn new(id: impl Into<String>, task_type: TaskType, data: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            task_type,
            priority: 0,
            data,
            partition_key: String::new(),
            created_at: Utc::now(),
            attempts: 0,
        }
    }

    pub fn with_partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = key.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Clone of this task with `attempts` incremented, for re-enqueue.
    pub fn retried(&self) -> Self {
        let mut next = self.clone();
        next.attempts += 1;
        next
    }
}

/// Additional variants may be added; the worker rejects unrecognized ones
/// with [`crate::error::WorkerError::UnknownTaskType`] rather than panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Capture,
    Dissect,
    Analyze,
    Aggregate,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Capture => "capture",
            TaskType::Dissect => "dissect",
            TaskType::Analyze => "analyze",
            TaskType::Aggregate => "aggregate",
        }
    }
}

/// Exactly one terminal result is produced per logical task: retries
/// produce at most one successful result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", with = "base64_bytes_opt", default)]
    pub data: Option<Vec<u8>>,
    pub processing_time_ns: u64,
    pub completed_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn success(task_id: impl Into<String>, data: Vec<u8>, processing_time: Duration) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            error: None,
            data: Some(data),
            processing_time_ns: processing_time.as_nanos() as u64,
            completed_at: Utc::now(),
        }
    }

    pub fn failure(task_id: impl Into<String>, error: impl Into<String>, processing_time: Duration) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            error: Some(error.into()),
            data: None,
            processing_time_ns: processing_time.as_nanos() as u64,
            completed_at: Utc::now(),
        }
    }

    pub fn processing_time(&self) -> Duration {
        Duration::from_nanos(self.processing_time_ns)
    }
}

mod base64_bytes {
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(serde::de::Error::custom)
    }
}

mod base64_bytes_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => super::base64_bytes::serialize(b, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        match s {
            Some(s) => Ok(Some(
                base64::engine::general_purpose::STANDARD
                    .decode(s)
                    .map_err(serde::de::Error::custom)?,
            )),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_increments_attempts_and_preserves_id() {
        let t = Task::new("t1", TaskType::Analyze, vec![1, 2, 3]);
        let r = t.retried();
        assert_eq!(r.id, t.id);
        assert_eq!(r.attempts, 1);
        let r2 = r.retried();
        assert_eq!(r2.attempts, 2);
    }

    #[test]
    fn wire_roundtrip_preserves_data() {
        let t = Task::new("t1", TaskType::Capture, vec![9, 8, 7]).with_partition_key("k1");
        let json = serde_json::to_string(&t).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back.data, t.data);
        assert_eq!(back.partition_key, "k1");
        assert_eq!(back.task_type, TaskType::Capture);
    }

    #[test]
    fn result_processing_time_roundtrips() {
        let r = TaskResult::success("t1", vec![1], Duration::from_millis(5));
        assert_eq!(r.processing_time(), Duration::from_millis(5));
    }
}
