//! Health check endpoints
//!
//! Provides simple health check for monitoring probes.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use crate::http::AppState;

/// Health check router
pub fn create_health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness))
}

/// Basic health check (always returns OK if server is running)
pub async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Readiness with a few gauges for dashboards
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ready",
        "channels": state.store.len(),
        "channels_with_viewers": state.presence.channel_count(),
    }))
}
