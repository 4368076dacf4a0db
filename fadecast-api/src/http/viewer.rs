//! Viewer presence routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use fadecast_core::models::{ChannelId, ViewerId};

use super::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ViewerRequest {
    pub viewer_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ViewerCountResponse {
    pub count: usize,
}

fn viewer_id(raw: &str) -> AppResult<ViewerId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > 64 {
        return Err(AppError::bad_request("viewer_id must be 1-64 characters"));
    }
    Ok(ViewerId::from(trimmed))
}

/// Heartbeat; answers with the current count
pub async fn ping(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(req): Json<ViewerRequest>,
) -> AppResult<Json<ViewerCountResponse>> {
    let channel_id = ChannelId::from(channel_id);
    // Only existing channels accumulate presence entries
    state.store.get_channel(&channel_id)?;

    if state.presence.heartbeat(&channel_id, viewer_id(&req.viewer_id)?) {
        tracing::debug!(channel_id = %channel_id, viewer_id = %req.viewer_id, "Viewer joined");
    }
    Ok(Json(ViewerCountResponse {
        count: state.presence.count(&channel_id),
    }))
}

/// Leave. The body is read as text so that page-unload beacons, which send
/// `text/plain`, are accepted alongside regular JSON requests.
pub async fn leave(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    body: String,
) -> AppResult<StatusCode> {
    let req: ViewerRequest = serde_json::from_str(&body)?;
    let channel_id = ChannelId::from(channel_id);

    if state.presence.leave(&channel_id, &viewer_id(&req.viewer_id)?) {
        tracing::debug!(channel_id = %channel_id, viewer_id = %req.viewer_id, "Viewer left");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Live viewer count for the broadcaster UI
pub async fn count(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> AppResult<Json<ViewerCountResponse>> {
    let channel_id = ChannelId::from(channel_id);
    state.store.get_channel(&channel_id)?;
    Ok(Json(ViewerCountResponse {
        count: state.presence.count(&channel_id),
    }))
}
