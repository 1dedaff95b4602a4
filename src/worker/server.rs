//! HTTP surface for a worker: `/task`, `/batch`, `/health`, `/metrics`.

use super::executor::ExecutorPool;
use super::health::WorkerHealth;
use super::queue::TaskQueue;
use crate::metrics::Metrics;
use crate::task::{Task, TaskResult};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

const BATCH_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone)]
struct WorkerState {
    queue: TaskQueue,
    health: Arc<WorkerHealth>,
    pool: Arc<ExecutorPool>,
    metrics: Metrics,
}

#[derive(Serialize)]
struct QueuedResponse {
    status: &'static str,
}

pub fn create_router(queue: TaskQueue, health: Arc<WorkerHealth>, pool: Arc<ExecutorPool>, metrics: Metrics) -> Router {
    let state = WorkerState { queue, health, pool, metrics };
    Router::new()
        .route("/task", post(submit_task))
        .route("/batch", post(submit_batch))
        .route("/health", get(get_health))
        .route("/metrics", get(get_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn submit_task(State(state): State<WorkerState>, body: Result<Json<Task>, axum::extract::rejection::JsonRejection>) -> impl IntoResponse {
    let Json(task) = match body {
        Ok(j) => j,
        Err(_) => return (StatusCode::BAD_REQUEST, Json(QueuedResponse { status: "decode_error" })),
    };
    state.health.set_queue_depth(state.queue.depth_hint());
    match state.queue.try_push(task) {
        Ok(()) => (StatusCode::ACCEPTED, Json(QueuedResponse { status: "queued" })),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, Json(QueuedResponse { status: "queue_full" })),
    }
}

async fn submit_batch(State(state): State<WorkerState>, body: Result<Json<Vec<Task>>, axum::extract::rejection::JsonRejection>) -> impl IntoResponse {
    let Json(tasks) = match body {
        Ok(j) => j,
        Err(_) => return (StatusCode::BAD_REQUEST, Json(Vec::<TaskResult>::new())).into_response(),
    };

    match tokio::time::timeout(BATCH_TIMEOUT, state.pool.execute_batch(&tasks)).await {
        Ok(results) => {
            for r in &results {
                if r.success {
                    state.metrics.record_task_completed(r.processing_time().as_secs_f64() * 1000.0);
                } else {
                    state.metrics.record_task_failed();
                }
            }
            (StatusCode::OK, Json(results)).into_response()
        }
        Err(_) => {
            info!(batch_size = tasks.len(), "batch execution timed out");
            StatusCode::REQUEST_TIMEOUT.into_response()
        }
    }
}

async fn get_health(State(state): State<WorkerState>) -> impl IntoResponse {
    let snapshot = state.health.snapshot();
    let status = if snapshot.healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(snapshot))
}

async fn get_metrics(State(state): State<WorkerState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "tasks_completed": state.metrics.tasks_completed(),
        "tasks_failed": state.metrics.tasks_failed(),
        "health": state.health.snapshot(),
    }))
}
