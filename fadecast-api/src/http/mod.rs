// Module: http
// HTTP/JSON surface for broadcaster pushes and viewer polls

pub mod channel;
pub mod error;
pub mod health;
pub mod viewer;

use axum::{
    routing::{get, post},
    Router,
};
use fadecast_core::service::{ChannelStateStore, PresenceTracker};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub use error::{AppError, AppResult};

/// Largest request body accepted (snapshots are a few hundred bytes)
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: ChannelStateStore,
    pub presence: PresenceTracker,
}

impl AppState {
    #[must_use]
    pub const fn new(store: ChannelStateStore, presence: PresenceTracker) -> Self {
        Self { store, presence }
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    // Viewers poll from arbitrary origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::create_health_router())
        // Channel provisioning
        .route("/channels", post(channel::create_channel))
        .route("/channel/code/{code}", get(channel::lookup_by_code))
        .route("/channel/{id}", get(channel::get_channel))
        .route("/channel/{id}/settings", post(channel::update_settings))
        // Sync endpoint
        .route("/channel/{id}/state", get(channel::get_state))
        .route("/channel/{id}/sync", post(channel::sync))
        .route("/channel/{id}/start-broadcast", post(channel::start_broadcast))
        .route("/channel/{id}/stop-broadcast", post(channel::stop_broadcast))
        // Presence
        .route("/channel/{id}/viewer/ping", post(viewer::ping))
        .route("/channel/{id}/viewer/leave", post(viewer::leave))
        .route("/channel/{id}/viewers", get(viewer::count))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
