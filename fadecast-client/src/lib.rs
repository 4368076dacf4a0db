//! Viewer and broadcaster clients for a fadecast server.
//!
//! The viewer side is split into a synchronous [`ViewerReconciler`] that owns
//! all sync decisions and an async [`ViewerSession`] that feeds it polls,
//! player callbacks and animation frames.

pub mod animation;
pub mod broadcaster;
pub mod client;
pub mod drift;
pub mod error;
pub mod headless;
pub mod identity;
pub mod idle;
pub mod player;
pub mod reconciler;
mod reconnect;
pub mod session;
pub mod slot;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use broadcaster::BroadcastDeck;
pub use client::SyncClient;
pub use error::{ClientError, Result};
pub use headless::HeadlessPlayer;
pub use identity::ViewerIdentity;
pub use player::{ExternalPlayer, PlayerError, PlayerEvent, PlayerEventKind, PlayerGeneration, PlayerState};
pub use reconciler::{ConnectionState, PollOutcome, ReconcilerConfig, ViewerReconciler, ViewerView};
pub use session::{SessionTiming, ViewerSession};

/// Wall clock in epoch milliseconds, the time base shared with the server
#[must_use]
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
