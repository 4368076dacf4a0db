//! Seam between the reconciler and an embeddable player.
//!
//! Each virtual deck drives one [`ExternalPlayer`]. Commands are fire and
//! forget; completion arrives later as a [`PlayerEvent`] tagged with the load
//! generation that produced it, so callbacks from a superseded load can be
//! told apart from the current one.

use std::fmt;

use fadecast_core::models::Slot;
use thiserror::Error;

/// Monotonic counter bumped on every load or cue issued to a slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerGeneration(u64);

impl PlayerGeneration {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlayerGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playback state as reported by the embedded player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl PlayerState {
    /// Buffering counts as playing: the player intends to make progress
    #[must_use]
    pub const fn is_playing(self) -> bool {
        matches!(self, Self::Playing | Self::Buffering)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    #[error("Player not ready")]
    NotReady,

    #[error("Player unavailable: {0}")]
    Unavailable(String),

    #[error("Player rejected command: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEventKind {
    /// The load or cue for this generation finished initialising
    Ready,
    StateChanged(PlayerState),
    Error(String),
}

/// Asynchronous notification from a player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEvent {
    pub slot: Slot,
    pub generation: PlayerGeneration,
    pub kind: PlayerEventKind,
}

impl PlayerEvent {
    #[must_use]
    pub const fn new(slot: Slot, generation: PlayerGeneration, kind: PlayerEventKind) -> Self {
        Self {
            slot,
            generation,
            kind,
        }
    }
}

/// Commands the reconciler issues to one embedded player.
///
/// Implementations must not block. Loads report completion through a
/// [`PlayerEventKind::Ready`] event carrying the generation passed in.
#[cfg_attr(test, mockall::automock)]
pub trait ExternalPlayer: Send {
    /// Load and start playing
    fn load_by_id(&mut self, video_id: &str, generation: PlayerGeneration) -> Result<(), PlayerError>;

    /// Load without starting playback
    fn cue_by_id(&mut self, video_id: &str, generation: PlayerGeneration) -> Result<(), PlayerError>;

    fn play(&mut self) -> Result<(), PlayerError>;

    fn pause(&mut self) -> Result<(), PlayerError>;

    fn seek(&mut self, seconds: f64, allow_seek_ahead: bool) -> Result<(), PlayerError>;

    /// Volume in `0..=100`
    fn set_volume(&mut self, volume: u8) -> Result<(), PlayerError>;

    fn current_time(&self) -> Result<f64, PlayerError>;

    fn duration(&self) -> Result<f64, PlayerError>;

    fn player_state(&self) -> Result<PlayerState, PlayerError>;
}
