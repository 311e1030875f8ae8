use axum::{Json, extract::State};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::domain::StreamMetrics;
use crate::presentation::rest::{ApiError, AppState};

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Current aggregate counters, pulled from the engine
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<Json<StreamMetrics>, ApiError> {
    let snapshot = state.handle.metrics().await?;
    Ok(Json(snapshot))
}
