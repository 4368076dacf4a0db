//! Async driver for a viewer.
//!
//! Three loops share one [`ViewerReconciler`]:
//! - poll: fetch channel state every poll interval and feed player events
//! - heartbeat: keep the viewer counted in presence
//! - frame: advance local fade animation between polls
//!
//! The reconciler lock is never held across an await.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fadecast_core::config::ViewerConfig;
use fadecast_core::models::{ChannelId, ViewerId};

use crate::client::SyncClient;
use crate::error::Result;
use crate::now_ms;
use crate::player::{ExternalPlayer, PlayerEvent};
use crate::reconciler::{ConnectionState, PollOutcome, ViewerReconciler, ViewerView};

const LEAVE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    pub frame_interval: Duration,
}

impl From<&ViewerConfig> for SessionTiming {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            heartbeat_interval: Duration::from_millis(config.heartbeat_interval_ms),
            frame_interval: Duration::from_millis(config.frame_interval_ms),
        }
    }
}

fn poll_outcome(result: Result<Option<fadecast_core::models::ChannelStateView>>) -> PollOutcome {
    match result {
        Ok(Some(view)) => PollOutcome::State(view),
        Ok(None) => PollOutcome::ChannelMissing,
        Err(e) => {
            debug!(error = %e, "State poll failed");
            PollOutcome::TransportError
        }
    }
}

pub struct ViewerSession<P> {
    client: SyncClient,
    channel_id: ChannelId,
    viewer_id: ViewerId,
    reconciler: Arc<Mutex<ViewerReconciler<P>>>,
    cancel_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl<P: ExternalPlayer + 'static> ViewerSession<P> {
    /// Spawn the session loops. `events` is the receiving end of the channel
    /// the players report on.
    pub fn start(
        client: SyncClient,
        channel_id: ChannelId,
        viewer_id: ViewerId,
        reconciler: ViewerReconciler<P>,
        events: UnboundedReceiver<PlayerEvent>,
        timing: SessionTiming,
    ) -> Self {
        let reconciler = Arc::new(Mutex::new(reconciler));
        let cancel_token = CancellationToken::new();

        info!(channel_id = %channel_id, viewer_id = %viewer_id, "Viewer session starting");
        let tasks = vec![
            Self::spawn_poll_loop(
                client.clone(),
                channel_id.clone(),
                reconciler.clone(),
                events,
                timing.poll_interval,
                cancel_token.clone(),
            ),
            Self::spawn_heartbeat_loop(
                client.clone(),
                channel_id.clone(),
                viewer_id.clone(),
                timing.heartbeat_interval,
                cancel_token.clone(),
            ),
            Self::spawn_frame_loop(reconciler.clone(), timing.frame_interval, cancel_token.clone()),
        ];

        Self {
            client,
            channel_id,
            viewer_id,
            reconciler,
            cancel_token,
            tasks,
        }
    }

    fn spawn_poll_loop(
        client: SyncClient,
        channel_id: ChannelId,
        reconciler: Arc<Mutex<ViewerReconciler<P>>>,
        mut events: UnboundedReceiver<PlayerEvent>,
        period: Duration,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last_state = ConnectionState::Connecting;

            loop {
                tokio::select! {
                    () = cancel_token.cancelled() => break,
                    _ = ticker.tick() => {
                        let result = tokio::select! {
                            () = cancel_token.cancelled() => break,
                            result = client.fetch_state(&channel_id) => result,
                        };
                        let state = reconciler.lock().apply_poll(poll_outcome(result), now_ms());
                        if state != last_state {
                            debug!(channel_id = %channel_id, from = %last_state, to = %state, "Connection state changed");
                            last_state = state;
                        }
                    }
                    Some(event) = events.recv() => {
                        reconciler.lock().on_player_event(event, now_ms());
                    }
                }
            }
            debug!(channel_id = %channel_id, "Poll loop stopped");
        })
    }

    fn spawn_heartbeat_loop(
        client: SyncClient,
        channel_id: ChannelId,
        viewer_id: ViewerId,
        period: Duration,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = cancel_token.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            () = cancel_token.cancelled() => break,
                            result = client.ping(&channel_id, &viewer_id) => match result {
                                Ok(count) => debug!(channel_id = %channel_id, viewers = count, "Heartbeat"),
                                Err(e) => debug!(channel_id = %channel_id, error = %e, "Heartbeat failed"),
                            },
                        }
                    }
                }
            }
        })
    }

    fn spawn_frame_loop(
        reconciler: Arc<Mutex<ViewerReconciler<P>>>,
        period: Duration,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = cancel_token.cancelled() => break,
                    _ = ticker.tick() => {
                        reconciler.lock().animate(now_ms());
                    }
                }
            }
        })
    }

    #[must_use]
    pub fn view(&self) -> ViewerView {
        self.reconciler.lock().view(now_ms())
    }

    #[must_use]
    pub fn connection(&self) -> ConnectionState {
        self.reconciler.lock().connection()
    }

    #[must_use]
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    /// Run `f` against the reconciler under its lock
    pub fn inspect<T>(&self, f: impl FnOnce(&ViewerReconciler<P>) -> T) -> T {
        f(&self.reconciler.lock())
    }

    /// Stop all loops and tell the server this viewer left
    pub async fn shutdown(&mut self) {
        self.cancel_token.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "Viewer session task failed");
            }
        }

        match tokio::time::timeout(LEAVE_TIMEOUT, self.client.leave(&self.channel_id, &self.viewer_id)).await {
            Ok(Ok(())) => debug!(channel_id = %self.channel_id, "Left channel"),
            Ok(Err(e)) => debug!(channel_id = %self.channel_id, error = %e, "Leave failed"),
            Err(_) => debug!(channel_id = %self.channel_id, "Leave timed out"),
        }
        info!(channel_id = %self.channel_id, "Viewer session stopped");
    }
}

impl<P> Drop for ViewerSession<P> {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
