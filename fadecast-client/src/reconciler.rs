//! Viewer reconciler.
//!
//! Drives two local players toward the broadcaster's latest snapshot. The
//! reconciler is purely synchronous and takes the wall clock as an argument;
//! [`crate::session::ViewerSession`] owns the timers that feed it.
//!
//! Connection lifecycle:
//!
//! ```text
//! CONNECTING --live poll--> LIVE --not live / 404--> ENDED --live poll--> LIVE
//!      \-------not live / 404-------------------------^
//! ```
//!
//! Transport failures never change the connection state; the next poll is
//! simply retried.

use tracing::{debug, info, warn};

use fadecast_core::config::ViewerConfig;
use fadecast_core::fade::to_wire_value;
use fadecast_core::models::{ChannelStateView, Slot, Snapshot};

use crate::animation::{FadeAnimator, FadeChange};
use crate::drift::DriftPolicy;
use crate::idle::{should_show_idle, IdleInputs};
use crate::player::{ExternalPlayer, PlayerEvent, PlayerEventKind};
use crate::slot::PlaybackSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Live,
    Ended,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Live => write!(f, "live"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// Result of one poll of the sync endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    State(ChannelStateView),
    /// The channel does not exist (HTTP 404)
    ChannelMissing,
    /// Network or server failure; nothing is known
    TransportError,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcilerConfig {
    pub fade_cooldown_ms: i64,
    pub drift: DriftPolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            fade_cooldown_ms: 2_000,
            drift: DriftPolicy::default(),
        }
    }
}

impl From<&ViewerConfig> for ReconcilerConfig {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            fade_cooldown_ms: config.fade_cooldown_ms,
            drift: DriftPolicy::from(config),
        }
    }
}

/// What the viewer UI renders at a given instant
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerView {
    pub connection: ConnectionState,
    /// Rendered crossfade position, fractional while a fade replays
    pub crossfade: f64,
    pub fade_in_flight: bool,
    pub show_idle: bool,
    pub idle_image_url: Option<String>,
    pub playlist_name: Option<String>,
    /// Milliseconds since the active stream started
    pub elapsed_ms: Option<i64>,
    pub revision: Option<u64>,
}

impl ViewerView {
    /// Opacity of a slot's video layer in `[0, 1]`
    #[must_use]
    pub fn opacity(&self, slot: Slot) -> f64 {
        slot.share(self.crossfade) / 100.0
    }
}

pub struct ViewerReconciler<P> {
    config: ReconcilerConfig,
    connection: ConnectionState,
    pub(crate) slots: [PlaybackSlot<P>; 2],
    pub(crate) animator: FadeAnimator,
    /// Latest live snapshot
    pub(crate) snapshot: Option<Snapshot>,
    /// Next snapshot is treated as the first one ever received
    pub(crate) bootstrap: bool,
    /// Some slot has been loaded in this broadcast session
    pub(crate) any_loaded: bool,
    idle_image_url: Option<String>,
    playlist_name: Option<String>,
}

impl<P: ExternalPlayer> ViewerReconciler<P> {
    pub fn new(config: ReconcilerConfig, player_a: P, player_b: P) -> Self {
        Self {
            config,
            connection: ConnectionState::Connecting,
            slots: [
                PlaybackSlot::new(Slot::A, player_a),
                PlaybackSlot::new(Slot::B, player_b),
            ],
            animator: FadeAnimator::new(),
            snapshot: None,
            bootstrap: true,
            any_loaded: false,
            idle_image_url: None,
            playlist_name: None,
        }
    }

    #[must_use]
    pub const fn connection(&self) -> ConnectionState {
        self.connection
    }

    #[must_use]
    pub const fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    #[must_use]
    pub const fn slot(&self, slot: Slot) -> &PlaybackSlot<P> {
        &self.slots[slot.index()]
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut PlaybackSlot<P> {
        &mut self.slots[slot.index()]
    }

    /// Fold one poll result in and return the resulting connection state
    pub fn apply_poll(&mut self, outcome: PollOutcome, now_ms: i64) -> ConnectionState {
        match outcome {
            PollOutcome::TransportError => {
                debug!(state = %self.connection, "Poll failed, keeping state");
            }
            PollOutcome::ChannelMissing => self.enter_ended(None, None),
            PollOutcome::State(view) if !view.is_broadcasting => {
                self.enter_ended(view.idle_image_url, view.playlist_name);
            }
            PollOutcome::State(view) => {
                match self.connection {
                    ConnectionState::Connecting => {
                        info!("Broadcast is live");
                        self.bootstrap = true;
                    }
                    ConnectionState::Ended => self.handle_reconnect(),
                    ConnectionState::Live => {}
                }
                self.connection = ConnectionState::Live;
                self.idle_image_url = view.idle_image_url;
                self.playlist_name = view.playlist_name;
                self.reconcile(view.state.unwrap_or_default(), now_ms);
            }
        }
        self.connection
    }

    fn enter_ended(&mut self, idle_image_url: Option<String>, playlist_name: Option<String>) {
        if self.connection != ConnectionState::Ended {
            info!(previous = %self.connection, "Broadcast ended");
            for slot in &mut self.slots {
                if slot.local_state().is_playing() {
                    slot.pause();
                }
            }
        }
        self.connection = ConnectionState::Ended;
        self.idle_image_url = idle_image_url;
        self.playlist_name = playlist_name;
    }

    fn reconcile(&mut self, snapshot: Snapshot, now_ms: i64) {
        match self
            .animator
            .observe(snapshot.fade_trigger, snapshot.crossfade_value, now_ms)
        {
            FadeChange::Started(trigger) => debug!(
                started_at = trigger.started_at,
                start_value = trigger.start_value,
                end_value = trigger.end_value,
                duration_ms = trigger.duration_ms,
                "Replaying fade"
            ),
            FadeChange::Cleared => debug!(crossfade = snapshot.crossfade_value, "Fade cleared"),
            FadeChange::Unchanged => {}
        }

        let crossfade = self.animator.value(now_ms);
        let fade_in_flight = self.animator.in_flight(now_ms);

        self.sync_loads(&snapshot, crossfade, now_ms);
        for slot in Slot::ALL {
            self.sync_transport(slot, &snapshot, now_ms);
        }
        if !fade_in_flight {
            for slot in Slot::ALL {
                self.correct_drift(slot, &snapshot, crossfade, now_ms);
            }
        }

        self.snapshot = Some(snapshot);
        self.animate(now_ms);
    }

    fn sync_loads(&mut self, snapshot: &Snapshot, crossfade: f64, now_ms: i64) {
        let gate_open = self
            .animator
            .load_allowed(now_ms, self.config.fade_cooldown_ms);
        let mut pending = false;

        for slot in Slot::ALL {
            let Some(target) = snapshot.video_id(slot) else {
                continue;
            };
            if self.slots[slot.index()].loaded_video_id() == Some(target) {
                continue;
            }

            if !gate_open || (!self.bootstrap && slot.is_faded_out(crossfade)) {
                debug!(slot = %slot, video_id = target, bootstrap = self.bootstrap, "Load deferred");
                pending = true;
                continue;
            }

            let autoplay = snapshot.is_playing(slot);
            self.slots[slot.index()].begin_load(target, autoplay);
            self.any_loaded = true;
        }

        if self.bootstrap && !pending && self.any_loaded {
            debug!("Bootstrap complete");
            self.bootstrap = false;
        }
    }

    fn sync_transport(&mut self, slot: Slot, snapshot: &Snapshot, now_ms: i64) {
        let target = snapshot.video_id(slot);
        let playing = snapshot.is_playing(slot);
        let time = snapshot.time(slot);
        let deck = self.slot_mut(slot);

        if target.is_none() {
            if deck.is_ready() && deck.local_state().is_playing() {
                deck.pause();
            }
            return;
        }
        if !deck.is_settled_on(target) {
            return;
        }

        let transition = deck
            .record_broadcast_playing(playing)
            .is_some_and(|previous| previous != playing);
        let local_playing = deck.local_state().is_playing();

        if playing {
            if !local_playing {
                deck.play();
            }
            if transition {
                debug!(slot = %slot, time, "Resync on resume");
                deck.seek(time, now_ms);
            }
        } else if local_playing || transition {
            deck.pause();
            deck.seek(time, now_ms);
        }
    }

    fn correct_drift(&mut self, slot: Slot, snapshot: &Snapshot, crossfade: f64, now_ms: i64) {
        if !snapshot.is_playing(slot) || slot.is_faded_out(crossfade) {
            return;
        }
        let policy = self.config.drift;
        let target_time = snapshot.time(slot);
        let deck = self.slot_mut(slot);
        if !deck.is_settled_on(snapshot.video_id(slot)) {
            return;
        }
        let Some(local_time) = deck.local_time() else {
            return;
        };
        if policy.needs_correction(target_time, local_time, deck.last_seek_ms(), now_ms) {
            info!(slot = %slot, local_time, target_time, "Correcting drift");
            deck.seek(target_time, now_ms);
        }
    }

    /// Handle a player callback. Events from a superseded load are dropped.
    pub fn on_player_event(&mut self, event: PlayerEvent, now_ms: i64) {
        let slot = event.slot;
        let current = self.slot(slot).generation();
        if event.generation != current {
            debug!(
                slot = %slot,
                generation = %event.generation,
                current = %current,
                "Ignoring stale player event"
            );
            return;
        }

        match event.kind {
            PlayerEventKind::Ready => {
                if !self.slot_mut(slot).mark_ready(event.generation) {
                    debug!(slot = %slot, "Duplicate ready ignored");
                    return;
                }
                if self.connection == ConnectionState::Live {
                    self.initialise_slot(slot, now_ms);
                } else {
                    // A load that finishes after the broadcast ended stays silent
                    debug!(slot = %slot, state = %self.connection, "Ready while not live");
                    let deck = self.slot_mut(slot);
                    if deck.local_state().is_playing() {
                        deck.pause();
                    }
                }
            }
            PlayerEventKind::StateChanged(state) => {
                debug!(slot = %slot, state = ?state, "Player state changed");
            }
            PlayerEventKind::Error(message) => {
                warn!(slot = %slot, error = %message, "Player reported an error");
            }
        }
    }

    /// First command round after a load completes: seek once to the
    /// broadcaster's position, match its playing flag, set the volume
    fn initialise_slot(&mut self, slot: Slot, now_ms: i64) {
        let crossfade = self.animator.value(now_ms);
        let Some(snapshot) = self.snapshot.as_ref() else {
            return;
        };
        let playing = snapshot.is_playing(slot);
        let time = snapshot.time(slot);
        let deck = &mut self.slots[slot.index()];
        if !deck.is_settled_on(snapshot.video_id(slot)) {
            return;
        }

        debug!(slot = %slot, time, playing, "Slot ready");
        deck.seek(time, now_ms);
        if playing {
            deck.play();
        } else if deck.local_state().is_playing() {
            deck.pause();
        }
        deck.record_broadcast_playing(playing);
        deck.invalidate_volume();
        deck.apply_volume(volume_for(slot, crossfade));
    }

    /// Advance the local fade to `now_ms` and push volumes that changed.
    /// Returns the rendered crossfade.
    pub fn animate(&mut self, now_ms: i64) -> f64 {
        let crossfade = self.animator.value(now_ms);
        for deck in &mut self.slots {
            let volume = volume_for(deck.slot(), crossfade);
            deck.apply_volume(volume);
        }
        crossfade
    }

    /// Idle overlay at `now_ms`, read from the players' current state so it
    /// tracks embed callbacks between polls
    #[must_use]
    pub fn show_idle(&self, now_ms: i64) -> bool {
        should_show_idle(&IdleInputs {
            is_broadcasting: self.connection == ConnectionState::Live,
            is_stopped: self.snapshot.as_ref().is_some_and(|s| s.is_stopped),
            any_slot_loaded: self.any_loaded,
            fade_in_flight: self.animator.in_flight(now_ms),
            slots_playing: [
                self.slots[0].local_state().is_playing(),
                self.slots[1].local_state().is_playing(),
            ],
        })
    }

    #[must_use]
    pub fn view(&self, now_ms: i64) -> ViewerView {
        let live = self.connection == ConnectionState::Live;
        ViewerView {
            connection: self.connection,
            crossfade: self.animator.value(now_ms),
            fade_in_flight: live && self.animator.in_flight(now_ms),
            show_idle: self.show_idle(now_ms),
            idle_image_url: self.idle_image_url.clone(),
            playlist_name: self.playlist_name.clone(),
            elapsed_ms: if live {
                self.snapshot.as_ref().and_then(|s| s.elapsed_ms(now_ms))
            } else {
                None
            },
            revision: self.snapshot.as_ref().map(|s| s.revision),
        }
    }
}

/// Player volume for a slot at a crossfade position
fn volume_for(slot: Slot, crossfade: f64) -> u8 {
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let volume = to_wire_value(slot.share(crossfade)) as u8;
    volume
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
