//! Broadcaster-side deck model.
//!
//! Holds what the broadcaster's two players are doing and produces the
//! snapshot pushed on every sync. Fades are started here and repeated in each
//! snapshot until they complete, at which point the crossfade settles on the
//! fade's end value.

use tracing::info;

use fadecast_core::config::BroadcasterConfig;
use fadecast_core::fade::FadeTriggerGenerator;
use fadecast_core::models::{ChannelId, FadeTrigger, Slot, Snapshot, SyncReceipt, VideoRef, CROSSFADE_MAX};

use crate::client::SyncClient;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq)]
struct DeckSlot {
    video: Option<VideoRef>,
    playing: bool,
    time: f64,
    /// Track length in seconds, when known
    duration: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct BroadcastDeck {
    slots: [DeckSlot; 2],
    crossfade: i32,
    is_stopped: bool,
    started_at: Option<i64>,
    fades: FadeTriggerGenerator,
    fade_duration_ms: i64,
    auto_fade_lead_secs: f64,
}

impl BroadcastDeck {
    #[must_use]
    pub fn new(config: &BroadcasterConfig) -> Self {
        Self {
            slots: [DeckSlot::default(), DeckSlot::default()],
            crossfade: 0,
            is_stopped: false,
            started_at: None,
            fades: FadeTriggerGenerator::new(),
            fade_duration_ms: config.fade_duration_ms,
            auto_fade_lead_secs: config.auto_fade_lead_secs,
        }
    }

    fn deck(&self, slot: Slot) -> &DeckSlot {
        &self.slots[slot.index()]
    }

    fn deck_mut(&mut self, slot: Slot) -> &mut DeckSlot {
        &mut self.slots[slot.index()]
    }

    /// Put a track on a deck, paused at the start
    pub fn load(&mut self, slot: Slot, video: VideoRef, duration: Option<f64>) {
        info!(slot = %slot, video_id = %video.external_id, "Deck loaded");
        *self.deck_mut(slot) = DeckSlot {
            video: Some(video),
            playing: false,
            time: 0.0,
            duration: duration.filter(|d| *d > 0.0),
        };
    }

    pub fn eject(&mut self, slot: Slot) {
        *self.deck_mut(slot) = DeckSlot::default();
    }

    pub fn play(&mut self, slot: Slot, now_ms: i64) {
        if self.deck(slot).video.is_none() {
            return;
        }
        self.deck_mut(slot).playing = true;
        if slot == self.audible_slot(now_ms) || self.started_at.is_none() {
            self.started_at = Some(now_ms);
        }
    }

    pub fn pause(&mut self, slot: Slot) {
        self.deck_mut(slot).playing = false;
    }

    /// Position reported by the broadcaster's local player
    pub fn set_time(&mut self, slot: Slot, time: f64) {
        self.deck_mut(slot).time = time.max(0.0);
    }

    /// Manual fader move; abandons any fade in progress
    pub fn set_crossfade(&mut self, value: i32) {
        if self.fades.cancel().is_some() {
            info!("Fade cancelled by manual crossfade");
        }
        self.crossfade = value.clamp(0, CROSSFADE_MAX);
    }

    pub fn set_stopped(&mut self, stopped: bool) {
        self.is_stopped = stopped;
    }

    /// Crossfade position at `now_ms`, mid-fade values included
    #[must_use]
    pub fn crossfade_at(&self, now_ms: i64) -> f64 {
        self.fades
            .active(now_ms)
            .map_or(f64::from(self.crossfade), |t| t.value_at(now_ms))
    }

    /// Slot currently carrying most of the mix
    #[must_use]
    pub fn audible_slot(&self, now_ms: i64) -> Slot {
        if self.crossfade_at(now_ms) < f64::from(CROSSFADE_MAX) / 2.0 {
            Slot::A
        } else {
            Slot::B
        }
    }

    /// Start a fade toward `target` from wherever the fader is now
    pub fn crossfade_to(&mut self, target: Slot, now_ms: i64) -> FadeTrigger {
        let start = fadecast_core::fade::to_wire_value(self.crossfade_at(now_ms));
        self.crossfade = start;
        let trigger = self
            .fades
            .begin(now_ms, start, target.full_value(), self.fade_duration_ms);
        info!(
            target = %target,
            start_value = trigger.start_value,
            duration_ms = trigger.duration_ms,
            "Crossfade started"
        );
        trigger
    }

    /// Fade into the other deck when the audible track is about to run out.
    /// The incoming deck starts playing with the fade.
    pub fn check_auto_fade(&mut self, now_ms: i64) -> Option<FadeTrigger> {
        if self.fades.is_fading(now_ms) || self.is_stopped {
            return None;
        }
        let current = self.audible_slot(now_ms);
        let next = current.other();
        let deck = self.deck(current);
        let remaining = deck.duration? - deck.time;
        if !deck.playing || self.deck(next).video.is_none() || remaining > self.auto_fade_lead_secs {
            return None;
        }

        info!(from = %current, to = %next, remaining_secs = remaining, "Auto crossfade");
        self.deck_mut(next).playing = true;
        self.started_at = Some(now_ms);
        Some(self.crossfade_to(next, now_ms))
    }

    /// Build the snapshot to push at `now_ms`
    pub fn snapshot(&mut self, now_ms: i64) -> Snapshot {
        self.check_auto_fade(now_ms);
        let (crossfade_value, fade_trigger) = self.fades.settle(now_ms, self.crossfade);
        if fade_trigger.is_none() {
            self.crossfade = crossfade_value;
        }

        let mut snapshot = Snapshot {
            crossfade_value,
            fade_trigger,
            started_at: self.started_at,
            is_stopped: self.is_stopped,
            ..Snapshot::default()
        };
        for slot in Slot::ALL {
            let deck = self.deck(slot);
            snapshot.set_video(slot, deck.video.clone());
            snapshot.set_playing(slot, deck.playing);
            snapshot.set_time(slot, deck.time);
        }
        snapshot
    }

    /// Push the current snapshot
    pub async fn sync(&mut self, client: &SyncClient, channel_id: &ChannelId, now_ms: i64) -> Result<SyncReceipt> {
        let snapshot = self.snapshot(now_ms);
        client.sync(channel_id, &snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: i64 = 1_700_000_000_000;

    fn deck() -> BroadcastDeck {
        let mut deck = BroadcastDeck::new(&BroadcasterConfig::default());
        deck.load(Slot::A, VideoRef::new("a1").with_title("Opener"), Some(180.0));
        deck.load(Slot::B, VideoRef::new("b1"), Some(200.0));
        deck.play(Slot::A, T);
        deck
    }

    #[test]
    fn test_snapshot_mirrors_decks() {
        let mut deck = deck();
        deck.set_time(Slot::A, 42.0);

        let snapshot = deck.snapshot(T + 1_000);
        assert_eq!(snapshot.video_id(Slot::A), Some("a1"));
        assert_eq!(snapshot.video_id(Slot::B), Some("b1"));
        assert!(snapshot.player_a_playing);
        assert!(!snapshot.player_b_playing);
        assert_eq!(snapshot.player_a_time, 42.0);
        assert_eq!(snapshot.started_at, Some(T));
        assert!(snapshot.fade_trigger.is_none());
        assert!(fadecast_core::validation::validate_snapshot(&snapshot, T + 1_000).is_ok());
    }

    #[test]
    fn test_fade_is_repeated_then_settles() {
        let mut deck = deck();
        let trigger = deck.crossfade_to(Slot::B, T);

        let mid = deck.snapshot(T + 4_000);
        assert_eq!(mid.fade_trigger, Some(trigger));
        assert_eq!(mid.crossfade_value, 50);

        let done = deck.snapshot(T + 8_000);
        assert!(done.fade_trigger.is_none());
        assert_eq!(done.crossfade_value, 100);

        let later = deck.snapshot(T + 20_000);
        assert_eq!(later.crossfade_value, 100);
    }

    #[test]
    fn test_manual_move_cancels_fade() {
        let mut deck = deck();
        deck.crossfade_to(Slot::B, T);
        deck.set_crossfade(30);

        let snapshot = deck.snapshot(T + 1_000);
        assert!(snapshot.fade_trigger.is_none());
        assert_eq!(snapshot.crossfade_value, 30);
    }

    #[test]
    fn test_fade_from_mid_position() {
        let mut deck = deck();
        deck.crossfade_to(Slot::B, T);
        // Reverse halfway through
        let trigger = deck.crossfade_to(Slot::A, T + 4_000);
        assert_eq!(trigger.start_value, 50);
        assert_eq!(trigger.end_value, 0);
    }

    #[test]
    fn test_auto_fade_near_track_end() {
        let mut deck = deck();
        deck.set_time(Slot::A, 150.0);
        assert!(deck.snapshot(T + 1_000).fade_trigger.is_none());

        deck.set_time(Slot::A, 171.0);
        let snapshot = deck.snapshot(T + 2_000);
        let trigger = snapshot.fade_trigger.unwrap();
        assert_eq!(trigger.end_value, 100);
        assert!(snapshot.player_b_playing);
        assert_eq!(snapshot.started_at, Some(T + 2_000));

        // No second fade while the first runs
        deck.set_time(Slot::A, 175.0);
        assert_eq!(deck.snapshot(T + 3_000).fade_trigger, Some(trigger));
    }

    #[test]
    fn test_stopped_deck_shows_idle_and_holds_fades() {
        let mut deck = deck();
        deck.set_stopped(true);
        deck.set_time(Slot::A, 175.0);

        let snapshot = deck.snapshot(T + 1_000);
        assert!(snapshot.is_stopped);
        assert!(snapshot.fade_trigger.is_none());

        deck.set_stopped(false);
        assert!(deck.snapshot(T + 2_000).fade_trigger.is_some());
    }

    #[test]
    fn test_no_auto_fade_without_next_track() {
        let mut deck = deck();
        deck.eject(Slot::B);
        deck.set_time(Slot::A, 179.0);
        assert!(deck.check_auto_fade(T).is_none());
    }
}
