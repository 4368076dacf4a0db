use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{BroadcastCode, ChannelId, OwnerId};
use super::snapshot::Snapshot;

/// A broadcaster's addressable live session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(rename = "hash")]
    pub id: ChannelId,
    pub broadcast_code: BroadcastCode,
    pub owner_id: OwnerId,
    pub is_broadcasting: bool,
    pub current_playlist_id: Option<String>,
    pub playlist_name: Option<String>,
    pub idle_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Channel {
    #[must_use]
    pub fn new(owner_id: OwnerId, broadcast_code: BroadcastCode) -> Self {
        Self {
            id: ChannelId::new(),
            broadcast_code,
            owner_id,
            is_broadcasting: false,
            current_playlist_id: None,
            playlist_name: None,
            idle_image_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn apply_settings(&mut self, settings: ChannelSettings) {
        self.idle_image_url = settings.idle_image_url;
        self.current_playlist_id = settings.current_playlist_id;
        self.playlist_name = settings.playlist_name;
    }
}

/// Presentation settings of a channel, replaced as a whole
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    pub idle_image_url: Option<String>,
    pub current_playlist_id: Option<String>,
    pub playlist_name: Option<String>,
}

/// What a viewer poll returns.
///
/// `state` is `None` whenever the channel is not broadcasting, even if a
/// snapshot is staged for a quick restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStateView {
    pub is_broadcasting: bool,
    pub state: Option<Snapshot>,
    pub idle_image_url: Option<String>,
    pub playlist_name: Option<String>,
}

impl ChannelStateView {
    /// Sentinel for an existing channel that is not live
    #[must_use]
    pub const fn ended(idle_image_url: Option<String>, playlist_name: Option<String>) -> Self {
        Self {
            is_broadcasting: false,
            state: None,
            idle_image_url,
            playlist_name,
        }
    }
}

/// Acknowledgement of an accepted broadcaster write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReceipt {
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}
