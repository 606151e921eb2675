//! Health check handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// Liveness check.
///
/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Readiness check; verifies the queue connection.
///
/// GET /ready
pub async fn ready(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    match state.queue.len().await {
        Ok(depth) => Ok(Json(json!({ "status": "ready", "queue_depth": depth }))),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}
