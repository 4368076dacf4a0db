use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fade;

/// Snapshot layout version understood by this build
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Upper bound of the crossfader; 0 is all player A, 100 is all player B
pub const CROSSFADE_MAX: i32 = 100;

/// One of the two virtual decks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub const ALL: [Self; 2] = [Self::A, Self::B];

    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    /// Crossfader position at which this slot is fully audible
    #[must_use]
    pub const fn full_value(self) -> i32 {
        match self {
            Self::A => 0,
            Self::B => CROSSFADE_MAX,
        }
    }

    /// Volume (and opacity) share of this slot for a crossfader position
    #[must_use]
    pub fn share(self, crossfade: f64) -> f64 {
        let value = crossfade.clamp(0.0, f64::from(CROSSFADE_MAX));
        match self {
            Self::A => f64::from(CROSSFADE_MAX) - value,
            Self::B => value,
        }
    }

    /// Whether the crossfader sits at the extreme favouring the other slot
    #[must_use]
    pub fn is_faded_out(self, crossfade: f64) -> bool {
        self.share(crossfade) <= 0.0
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "a"),
            Self::B => write!(f, "b"),
        }
    }
}

/// A playable item from the external catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    pub external_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl VideoRef {
    #[must_use]
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            title: String::new(),
            thumbnail_url: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Immutable descriptor of an in-flight crossfade animation.
///
/// Viewers replay the easing curve locally from this descriptor, so a viewer
/// that sees it only once still lands on `end_value` by wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FadeTrigger {
    /// Epoch milliseconds at which the fade began
    pub started_at: i64,
    pub start_value: i32,
    pub end_value: i32,
    pub duration_ms: i64,
}

impl FadeTrigger {
    #[must_use]
    pub const fn ends_at(&self) -> i64 {
        self.started_at.saturating_add(self.duration_ms)
    }

    /// True during `[started_at, started_at + duration_ms)`
    #[must_use]
    pub const fn is_in_flight(&self, now_ms: i64) -> bool {
        now_ms >= self.started_at && now_ms < self.ends_at()
    }

    #[must_use]
    pub fn is_complete(&self, now_ms: i64) -> bool {
        now_ms >= self.ends_at()
    }

    /// Crossfade value on the eased curve at `now_ms`
    #[must_use]
    pub fn value_at(&self, now_ms: i64) -> f64 {
        fade::sample(self, now_ms)
    }
}

/// The wholesale-replaceable live state of a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub schema_version: u32,

    pub player_a_video: Option<VideoRef>,
    pub player_b_video: Option<VideoRef>,
    pub player_a_playing: bool,
    pub player_b_playing: bool,
    /// Broadcaster-reported playback positions in seconds
    pub player_a_time: f64,
    pub player_b_time: f64,

    pub crossfade_value: i32,
    /// Epoch milliseconds at which the active stream began playing
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fade_trigger: Option<FadeTrigger>,
    pub is_stopped: bool,

    // Server-stamped on write; whatever the client sends is discarded
    pub updated_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            player_a_video: None,
            player_b_video: None,
            player_a_playing: false,
            player_b_playing: false,
            player_a_time: 0.0,
            player_b_time: 0.0,
            crossfade_value: 0,
            started_at: None,
            fade_trigger: None,
            is_stopped: false,
            updated_at: None,
            revision: 0,
        }
    }
}

impl Snapshot {
    #[must_use]
    pub const fn video(&self, slot: Slot) -> Option<&VideoRef> {
        match slot {
            Slot::A => self.player_a_video.as_ref(),
            Slot::B => self.player_b_video.as_ref(),
        }
    }

    /// External id referenced by a slot, if any
    #[must_use]
    pub fn video_id(&self, slot: Slot) -> Option<&str> {
        self.video(slot).map(|v| v.external_id.as_str())
    }

    #[must_use]
    pub const fn is_playing(&self, slot: Slot) -> bool {
        match slot {
            Slot::A => self.player_a_playing,
            Slot::B => self.player_b_playing,
        }
    }

    #[must_use]
    pub const fn time(&self, slot: Slot) -> f64 {
        match slot {
            Slot::A => self.player_a_time,
            Slot::B => self.player_b_time,
        }
    }

    pub fn set_video(&mut self, slot: Slot, video: Option<VideoRef>) {
        match slot {
            Slot::A => self.player_a_video = video,
            Slot::B => self.player_b_video = video,
        }
    }

    pub fn set_playing(&mut self, slot: Slot, playing: bool) {
        match slot {
            Slot::A => self.player_a_playing = playing,
            Slot::B => self.player_b_playing = playing,
        }
    }

    pub fn set_time(&mut self, slot: Slot, time: f64) {
        match slot {
            Slot::A => self.player_a_time = time,
            Slot::B => self.player_b_time = time,
        }
    }

    /// Milliseconds since the active stream started, clamped at zero
    #[must_use]
    pub fn elapsed_ms(&self, now_ms: i64) -> Option<i64> {
        self.started_at.map(|start| (now_ms - start).max(0))
    }
}
