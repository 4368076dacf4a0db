//! A player with no output that keeps a simulated clock.
//!
//! Used by `fadecast watch` to follow a channel from a terminal: every
//! command the reconciler issues is logged and reflected in the player's
//! reported state, which makes the sync behaviour observable without an
//! embed.

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tracing::info;

use fadecast_core::models::Slot;

use crate::player::{ExternalPlayer, PlayerError, PlayerEvent, PlayerEventKind, PlayerGeneration, PlayerState};

pub struct HeadlessPlayer {
    slot: Slot,
    events: UnboundedSender<PlayerEvent>,
    generation: PlayerGeneration,
    video_id: Option<String>,
    state: PlayerState,
    /// Position when `anchor` was taken
    position: f64,
    /// Set while playing
    anchor: Option<Instant>,
    volume: u8,
}

impl HeadlessPlayer {
    #[must_use]
    pub const fn new(slot: Slot, events: UnboundedSender<PlayerEvent>) -> Self {
        Self {
            slot,
            events,
            generation: PlayerGeneration::new(0),
            video_id: None,
            state: PlayerState::Unstarted,
            position: 0.0,
            anchor: None,
            volume: 100,
        }
    }

    #[must_use]
    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    #[must_use]
    pub const fn volume(&self) -> u8 {
        self.volume
    }

    fn emit(&self, kind: PlayerEventKind) {
        // Receiver gone means the session is shutting down
        let _ = self.events.send(PlayerEvent::new(self.slot, self.generation, kind));
    }

    fn position_now(&self) -> f64 {
        match self.anchor {
            Some(anchor) => self.position + anchor.elapsed().as_secs_f64(),
            None => self.position,
        }
    }

    fn set_state(&mut self, state: PlayerState) {
        if self.state != state {
            self.state = state;
            self.emit(PlayerEventKind::StateChanged(state));
        }
    }

    fn open(&mut self, video_id: &str, generation: PlayerGeneration) {
        self.generation = generation;
        self.video_id = Some(video_id.to_string());
        self.position = 0.0;
        self.anchor = None;
        self.state = PlayerState::Unstarted;
    }

    fn require_video(&self) -> Result<(), PlayerError> {
        if self.video_id.is_none() {
            return Err(PlayerError::NotReady);
        }
        Ok(())
    }
}

impl ExternalPlayer for HeadlessPlayer {
    fn load_by_id(&mut self, video_id: &str, generation: PlayerGeneration) -> Result<(), PlayerError> {
        info!(slot = %self.slot, video_id, generation = %generation, "Load");
        self.open(video_id, generation);
        self.emit(PlayerEventKind::Ready);
        self.anchor = Some(Instant::now());
        self.set_state(PlayerState::Playing);
        Ok(())
    }

    fn cue_by_id(&mut self, video_id: &str, generation: PlayerGeneration) -> Result<(), PlayerError> {
        info!(slot = %self.slot, video_id, generation = %generation, "Cue");
        self.open(video_id, generation);
        self.emit(PlayerEventKind::Ready);
        self.set_state(PlayerState::Cued);
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        self.require_video()?;
        if self.anchor.is_none() {
            info!(slot = %self.slot, position = self.position, "Play");
            self.anchor = Some(Instant::now());
        }
        self.set_state(PlayerState::Playing);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        self.require_video()?;
        if self.anchor.is_some() {
            self.position = self.position_now();
            self.anchor = None;
            info!(slot = %self.slot, position = self.position, "Pause");
        }
        self.set_state(PlayerState::Paused);
        Ok(())
    }

    fn seek(&mut self, seconds: f64, _allow_seek_ahead: bool) -> Result<(), PlayerError> {
        self.require_video()?;
        info!(slot = %self.slot, from = self.position_now(), to = seconds, "Seek");
        self.position = seconds.max(0.0);
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), PlayerError> {
        self.volume = volume.min(100);
        Ok(())
    }

    fn current_time(&self) -> Result<f64, PlayerError> {
        self.require_video()?;
        Ok(self.position_now())
    }

    fn duration(&self) -> Result<f64, PlayerError> {
        // No catalogue access; duration is unknown
        Ok(0.0)
    }

    fn player_state(&self) -> Result<PlayerState, PlayerError> {
        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_load_reports_ready_for_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut player = HeadlessPlayer::new(Slot::A, tx);

        player.load_by_id("abc", PlayerGeneration::new(3)).unwrap();

        let ready = rx.recv().await.unwrap();
        assert_eq!(ready.slot, Slot::A);
        assert_eq!(ready.generation, PlayerGeneration::new(3));
        assert_eq!(ready.kind, PlayerEventKind::Ready);
        assert_eq!(
            rx.recv().await.unwrap().kind,
            PlayerEventKind::StateChanged(PlayerState::Playing)
        );
        assert_eq!(player.video_id(), Some("abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_advances_only_while_playing() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut player = HeadlessPlayer::new(Slot::B, tx);

        player.cue_by_id("abc", PlayerGeneration::new(1)).unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(player.current_time().unwrap(), 0.0);

        player.seek(30.0, true).unwrap();
        player.play().unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!((player.current_time().unwrap() - 32.0).abs() < 1e-6);

        player.pause().unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!((player.current_time().unwrap() - 32.0).abs() < 1e-6);
        assert_eq!(player.player_state().unwrap(), PlayerState::Paused);
    }

    #[test]
    fn test_commands_before_load_fail() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut player = HeadlessPlayer::new(Slot::A, tx);
        assert_eq!(player.play(), Err(PlayerError::NotReady));
        assert_eq!(player.seek(1.0, true), Err(PlayerError::NotReady));
        assert!(player.set_volume(250).is_ok());
        assert_eq!(player.volume(), 100);
    }
}
