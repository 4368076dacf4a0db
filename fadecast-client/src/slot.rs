//! Per-deck bookkeeping wrapped around one player

use tracing::{debug, warn};

use fadecast_core::models::Slot;

use crate::player::{ExternalPlayer, PlayerError, PlayerGeneration, PlayerState};

pub struct PlaybackSlot<P> {
    slot: Slot,
    player: P,
    generation: PlayerGeneration,
    /// Video the latest load or cue asked for
    loaded_video_id: Option<String>,
    /// Ready received for the current generation
    ready: bool,
    last_seek_ms: Option<i64>,
    /// Broadcaster playing flag seen at the previous reconcile
    last_broadcast_playing: Option<bool>,
    last_volume: Option<u8>,
}

impl<P: ExternalPlayer> PlaybackSlot<P> {
    pub const fn new(slot: Slot, player: P) -> Self {
        Self {
            slot,
            player,
            generation: PlayerGeneration::new(0),
            loaded_video_id: None,
            ready: false,
            last_seek_ms: None,
            last_broadcast_playing: None,
            last_volume: None,
        }
    }

    pub const fn slot(&self) -> Slot {
        self.slot
    }

    pub const fn generation(&self) -> PlayerGeneration {
        self.generation
    }

    pub fn loaded_video_id(&self) -> Option<&str> {
        self.loaded_video_id.as_deref()
    }

    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    pub const fn last_seek_ms(&self) -> Option<i64> {
        self.last_seek_ms
    }

    /// Loaded with `video_id` and ready to take commands
    pub fn is_settled_on(&self, video_id: Option<&str>) -> bool {
        self.ready && video_id.is_some() && self.loaded_video_id.as_deref() == video_id
    }

    pub const fn player(&self) -> &P {
        &self.player
    }

    /// Issue a load (autoplay) or cue under a fresh generation
    pub fn begin_load(&mut self, video_id: &str, autoplay: bool) {
        self.generation = self.generation.next();
        self.loaded_video_id = Some(video_id.to_string());
        self.ready = false;
        self.last_broadcast_playing = None;
        self.last_volume = None;

        let generation = self.generation;
        let op = if autoplay { "load" } else { "cue" };
        debug!(slot = %self.slot, video_id, generation = %generation, op, "Loading video");
        self.call(op, |p| {
            if autoplay {
                p.load_by_id(video_id, generation)
            } else {
                p.cue_by_id(video_id, generation)
            }
        });
    }

    /// Mark ready; false when the event belongs to an older load or the
    /// slot already initialised this generation
    pub fn mark_ready(&mut self, generation: PlayerGeneration) -> bool {
        if generation != self.generation || self.ready || self.loaded_video_id.is_none() {
            return false;
        }
        self.ready = true;
        true
    }

    pub fn play(&mut self) {
        self.call("play", |p| p.play());
    }

    pub fn pause(&mut self) {
        self.call("pause", |p| p.pause());
    }

    pub fn seek(&mut self, seconds: f64, now_ms: i64) {
        self.last_seek_ms = Some(now_ms);
        self.call("seek", |p| p.seek(seconds, true));
    }

    /// Apply a volume, skipping the call if it is unchanged
    pub fn apply_volume(&mut self, volume: u8) {
        if !self.ready || self.last_volume == Some(volume) {
            return;
        }
        if self.call("set_volume", |p| p.set_volume(volume)).is_some() {
            self.last_volume = Some(volume);
        }
    }

    /// Forget the last applied volume so the next apply always lands
    pub fn invalidate_volume(&mut self) {
        self.last_volume = None;
    }

    /// Swap in the broadcaster's playing flag, returning the previous one
    pub fn record_broadcast_playing(&mut self, playing: bool) -> Option<bool> {
        self.last_broadcast_playing.replace(playing)
    }

    pub fn local_state(&self) -> PlayerState {
        self.player.player_state().unwrap_or_default()
    }

    pub fn local_time(&self) -> Option<f64> {
        match self.player.current_time() {
            Ok(time) => Some(time),
            Err(e) => {
                debug!(slot = %self.slot, error = %e, "Current time unavailable");
                None
            }
        }
    }

    /// Drop everything learnt about the broadcast. The generation is kept so
    /// late callbacks from before the reset stay stale.
    pub fn reset(&mut self) {
        self.loaded_video_id = None;
        self.ready = false;
        self.last_seek_ms = None;
        self.last_broadcast_playing = None;
        self.last_volume = None;
    }

    /// Run a player command; failures are logged and swallowed so one bad
    /// embed never stalls the sync loop
    fn call<T>(&mut self, op: &'static str, f: impl FnOnce(&mut P) -> Result<T, PlayerError>) -> Option<T> {
        match f(&mut self.player) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(slot = %self.slot, op, error = %e, "Player command failed");
                None
            }
        }
    }
}
