//! Authoritative channel state
//!
//! One broadcaster writes each channel; any number of viewers read it. A
//! write replaces the stored snapshot wholesale (last-write-wins), so the
//! only synchronisation needed is the per-entry lock of the map itself.

use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use crate::{
    models::{
        BroadcastCode, Channel, ChannelId, ChannelSettings, ChannelStateView, OwnerId, Snapshot,
        SyncReceipt,
    },
    validation::{validate_settings, validate_snapshot},
    Error, Result,
};

/// Random draws before falling back to a linear scan for a free code
const CODE_RANDOM_ATTEMPTS: usize = 32;

#[derive(Debug, Clone)]
struct ChannelEntry {
    channel: Channel,
    snapshot: Option<Arc<Snapshot>>,
    revision: u64,
}

/// Single-writer, multi-reader store of the latest snapshot per channel
#[derive(Clone, Default)]
pub struct ChannelStateStore {
    channels: Arc<DashMap<ChannelId, ChannelEntry>>,
    owners: Arc<DashMap<OwnerId, ChannelId>>,
    codes: Arc<DashMap<BroadcastCode, ChannelId>>,
}

impl std::fmt::Debug for ChannelStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelStateStore")
            .field("channels", &self.channels.len())
            .finish()
    }
}

impl ChannelStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the owner's channel, creating it on first access
    pub fn get_or_create_for_owner(&self, owner_id: &OwnerId) -> Result<Channel> {
        // Holding the owner entry serialises concurrent first accesses
        match self.owners.entry(owner_id.clone()) {
            Entry::Occupied(occupied) => self.get_channel(occupied.get()),
            Entry::Vacant(vacant) => {
                let mut channel = Channel::new(owner_id.clone(), BroadcastCode::random());
                channel.broadcast_code = self.reserve_code(&channel.id)?;

                self.channels.insert(
                    channel.id.clone(),
                    ChannelEntry {
                        channel: channel.clone(),
                        snapshot: None,
                        revision: 0,
                    },
                );
                vacant.insert(channel.id.clone());

                info!(
                    channel_id = %channel.id,
                    owner_id = %owner_id,
                    broadcast_code = %channel.broadcast_code,
                    "Channel created"
                );
                Ok(channel)
            }
        }
    }

    fn reserve_code(&self, channel_id: &ChannelId) -> Result<BroadcastCode> {
        let random = (0..CODE_RANDOM_ATTEMPTS).map(|_| BroadcastCode::random());
        let exhaustive = (0..=BroadcastCode::MAX).filter_map(BroadcastCode::from_value);

        for code in random.chain(exhaustive) {
            if let Entry::Vacant(vacant) = self.codes.entry(code) {
                vacant.insert(channel_id.clone());
                return Ok(code);
            }
        }
        Err(Error::Internal("No free broadcast codes".to_string()))
    }

    pub fn get_channel(&self, channel_id: &ChannelId) -> Result<Channel> {
        self.channels
            .get(channel_id)
            .map(|entry| entry.channel.clone())
            .ok_or_else(|| Error::NotFound(format!("Channel {channel_id} not found")))
    }

    /// Replace the idle image and playlist reference of a channel
    pub fn update_settings(&self, channel_id: &ChannelId, settings: ChannelSettings) -> Result<Channel> {
        validate_settings(&settings)?;
        let mut entry = self.entry_mut(channel_id)?;
        entry.channel.apply_settings(settings);
        Ok(entry.channel.clone())
    }

    /// Validate and atomically replace the stored snapshot.
    ///
    /// A rejected snapshot leaves the store untouched. Writes to a channel
    /// that is not broadcasting are staged for a later restart.
    pub fn write(&self, channel_id: &ChannelId, mut snapshot: Snapshot) -> Result<SyncReceipt> {
        let updated_at = Utc::now();
        validate_snapshot(&snapshot, updated_at.timestamp_millis())?;

        let mut entry = self.entry_mut(channel_id)?;
        let revision = entry.revision + 1;

        snapshot.updated_at = Some(updated_at);
        snapshot.revision = revision;
        entry.snapshot = Some(Arc::new(snapshot));
        entry.revision = revision;

        debug!(channel_id = %channel_id, revision, "Snapshot replaced");
        Ok(SyncReceipt { revision, updated_at })
    }

    /// Read what a viewer should see.
    ///
    /// A channel that is not broadcasting yields the "ended" sentinel rather
    /// than an error; only an unknown channel is `NotFound`.
    pub fn read(&self, channel_id: &ChannelId) -> Result<ChannelStateView> {
        let entry = self
            .channels
            .get(channel_id)
            .ok_or_else(|| Error::NotFound(format!("Channel {channel_id} not found")))?;
        let channel = &entry.channel;

        if !channel.is_broadcasting {
            return Ok(ChannelStateView::ended(
                channel.idle_image_url.clone(),
                channel.playlist_name.clone(),
            ));
        }

        Ok(ChannelStateView {
            is_broadcasting: true,
            state: entry.snapshot.as_deref().cloned(),
            idle_image_url: channel.idle_image_url.clone(),
            playlist_name: channel.playlist_name.clone(),
        })
    }

    /// Mark a channel live; a staged snapshot becomes visible immediately
    pub fn start_broadcast(&self, channel_id: &ChannelId) -> Result<Channel> {
        self.set_broadcasting(channel_id, true)
    }

    /// Mark a channel ended. The snapshot is kept so a restart resumes smoothly.
    pub fn stop_broadcast(&self, channel_id: &ChannelId) -> Result<Channel> {
        self.set_broadcasting(channel_id, false)
    }

    fn set_broadcasting(&self, channel_id: &ChannelId, live: bool) -> Result<Channel> {
        let mut entry = self.entry_mut(channel_id)?;
        if entry.channel.is_broadcasting != live {
            entry.channel.is_broadcasting = live;
            info!(channel_id = %channel_id, is_broadcasting = live, "Broadcast state changed");
        }
        Ok(entry.channel.clone())
    }

    /// Resolve a 4-digit code to a channel that is currently live
    pub fn lookup_by_code(&self, code: BroadcastCode) -> Result<ChannelId> {
        let not_found = || Error::NotFound(format!("No live channel with code {code}"));

        let channel_id = self.codes.get(&code).map(|id| id.clone()).ok_or_else(not_found)?;
        match self.channels.get(&channel_id) {
            Some(entry) if entry.channel.is_broadcasting => Ok(channel_id),
            _ => Err(not_found()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    fn entry_mut(
        &self,
        channel_id: &ChannelId,
    ) -> Result<dashmap::mapref::one::RefMut<'_, ChannelId, ChannelEntry>> {
        self.channels
            .get_mut(channel_id)
            .ok_or_else(|| Error::NotFound(format!("Channel {channel_id} not found")))
    }
}
