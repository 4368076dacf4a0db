//! Channel routes: provisioning, broadcaster sync, and viewer state polling

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fadecast_core::models::{
    BroadcastCode, Channel, ChannelId, ChannelSettings, ChannelStateView, OwnerId, Snapshot,
    SyncReceipt,
};

use super::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    pub owner_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CodeLookupResponse {
    pub hash: ChannelId,
}

/// Get (or lazily create) the owner's channel
pub async fn create_channel(
    State(state): State<AppState>,
    Json(req): Json<CreateChannelRequest>,
) -> AppResult<Json<Channel>> {
    let owner_id = req.owner_id.trim();
    if owner_id.is_empty() {
        return Err(AppError::bad_request("owner_id must not be empty"));
    }

    let channel = state.store.get_or_create_for_owner(&OwnerId::from(owner_id))?;
    Ok(Json(channel))
}

/// Channel metadata
pub async fn get_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> AppResult<Json<Channel>> {
    let channel = state.store.get_channel(&ChannelId::from(channel_id))?;
    Ok(Json(channel))
}

/// Replace idle image and playlist reference
pub async fn update_settings(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(settings): Json<ChannelSettings>,
) -> AppResult<Json<Channel>> {
    let channel = state
        .store
        .update_settings(&ChannelId::from(channel_id), settings)?;
    Ok(Json(channel))
}

/// Viewer poll.
///
/// Unknown channels are a hard 404. A channel that exists but is not live
/// answers 200 with `is_broadcasting: false` and no state.
pub async fn get_state(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> AppResult<Json<ChannelStateView>> {
    let view = state.store.read(&ChannelId::from(channel_id))?;
    Ok(Json(view))
}

/// Broadcaster push: validate, then replace the snapshot wholesale
pub async fn sync(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(snapshot): Json<Snapshot>,
) -> AppResult<Json<SyncReceipt>> {
    let channel_id = ChannelId::from(channel_id);
    let receipt = state.store.write(&channel_id, snapshot).map_err(|e| {
        debug!(channel_id = %channel_id, error = %e, "Sync rejected");
        e
    })?;
    Ok(Json(receipt))
}

pub async fn start_broadcast(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> AppResult<Json<Channel>> {
    let channel = state.store.start_broadcast(&ChannelId::from(channel_id))?;
    info!(channel_id = %channel.id, "Broadcast started");
    Ok(Json(channel))
}

/// Stop broadcasting; the snapshot stays staged for a quick restart
pub async fn stop_broadcast(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> AppResult<Json<Channel>> {
    let channel = state.store.stop_broadcast(&ChannelId::from(channel_id))?;
    info!(channel_id = %channel.id, "Broadcast stopped");
    Ok(Json(channel))
}

/// Resolve a 4-digit code to the hash of a live channel
pub async fn lookup_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<CodeLookupResponse>> {
    let code = BroadcastCode::parse(&code)
        .ok_or_else(|| AppError::bad_request("Broadcast code must be exactly 4 digits"))?;
    let hash = state.store.lookup_by_code(code)?;
    Ok(Json(CodeLookupResponse { hash }))
}
