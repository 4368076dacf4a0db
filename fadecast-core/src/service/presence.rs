//! Heartbeat-based viewer counting
//!
//! Viewers ping periodically; an entry counts while its last heartbeat is at
//! most `ttl` old. Expired entries are pruned lazily on read and by a
//! periodic sweep, so a viewer that vanishes without saying goodbye is
//! overcounted for at most one TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::models::{ChannelId, ViewerId};

/// Per-channel viewer presence tracker
#[derive(Clone)]
pub struct PresenceTracker {
    channels: Arc<DashMap<ChannelId, HashMap<ViewerId, Instant>>>,
    ttl: Duration,
}

impl std::fmt::Debug for PresenceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceTracker")
            .field("channels", &self.channels.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl PresenceTracker {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            ttl,
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_live(&self, last_seen: Instant, now: Instant) -> bool {
        now.saturating_duration_since(last_seen) <= self.ttl
    }

    /// Record a heartbeat. Returns true if the viewer was not counted before.
    pub fn heartbeat(&self, channel_id: &ChannelId, viewer_id: ViewerId) -> bool {
        let now = Instant::now();
        let mut viewers = self.channels.entry(channel_id.clone()).or_default();
        match viewers.insert(viewer_id, now) {
            Some(previous) => !self.is_live(previous, now),
            None => true,
        }
    }

    /// Drop a viewer immediately. Returns true if it was present.
    pub fn leave(&self, channel_id: &ChannelId, viewer_id: &ViewerId) -> bool {
        let removed = self
            .channels
            .get_mut(channel_id)
            .is_some_and(|mut viewers| viewers.remove(viewer_id).is_some());
        self.channels.remove_if(channel_id, |_, viewers| viewers.is_empty());
        removed
    }

    /// Number of viewers whose last heartbeat is within the TTL
    #[must_use]
    pub fn count(&self, channel_id: &ChannelId) -> usize {
        let now = Instant::now();
        let count = match self.channels.get_mut(channel_id) {
            Some(mut viewers) => {
                viewers.retain(|_, last_seen| self.is_live(*last_seen, now));
                viewers.len()
            }
            None => return 0,
        };
        if count == 0 {
            self.channels.remove_if(channel_id, |_, viewers| viewers.is_empty());
        }
        count
    }

    /// Drop every expired entry across all channels. Returns the number pruned.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut pruned = 0;
        self.channels.retain(|_, viewers| {
            let before = viewers.len();
            viewers.retain(|_, last_seen| self.is_live(*last_seen, now));
            pruned += before - viewers.len();
            !viewers.is_empty()
        });
        if pruned > 0 {
            debug!(pruned, channels = self.channels.len(), "Presence sweep pruned expired viewers");
        }
        pruned
    }

    /// Run [`Self::sweep`] every `interval` until `cancel` fires
    #[must_use]
    pub fn spawn_sweeper(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let tracker = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        info!("Presence sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        tracker.sweep();
                    }
                }
            }
        })
    }

    /// Number of channels with at least one tracked entry
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(40);

    fn ids() -> (ChannelId, ViewerId, ViewerId) {
        (
            ChannelId::from("chan1"),
            ViewerId::from("viewer1"),
            ViewerId::from("viewer2"),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_and_count() {
        let tracker = PresenceTracker::new(TTL);
        let (channel, v1, v2) = ids();

        assert!(tracker.heartbeat(&channel, v1.clone()));
        assert!(!tracker.heartbeat(&channel, v1));
        assert!(tracker.heartbeat(&channel, v2));

        assert_eq!(tracker.count(&channel), 2);
        assert_eq!(tracker.count(&ChannelId::from("other")), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_excludes_expired_entries() {
        let tracker = PresenceTracker::new(TTL);
        let (channel, v1, v2) = ids();

        tracker.heartbeat(&channel, v1.clone());
        tokio::time::advance(Duration::from_secs(30)).await;
        tracker.heartbeat(&channel, v2);

        // Exactly at the TTL boundary v1 still counts
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(tracker.count(&channel), 2);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(tracker.count(&channel), 1);

        // A fresh heartbeat brings v1 back as a new viewer
        assert!(tracker.heartbeat(&channel, v1));
        assert_eq!(tracker.count(&channel), 2);

        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        assert_eq!(tracker.count(&channel), 0);
        assert_eq!(tracker.channel_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_respects_ttl_for_interleaved_heartbeats() {
        let tracker = PresenceTracker::new(TTL);
        let channel = ChannelId::from("chan1");
        let viewers: Vec<ViewerId> = (0..6).map(|i| ViewerId::from(format!("v{i}"))).collect();
        let mut last_seen = vec![None::<Instant>; viewers.len()];

        // Deterministic pseudo-random schedule of heartbeats and clock jumps
        let mut seed: u64 = 0x9e37_79b9;
        for _ in 0..300 {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let who = usize::try_from(seed >> 61).unwrap_or(0) % viewers.len();
            let jump = Duration::from_millis((seed >> 20) % 15_000);

            tokio::time::advance(jump).await;
            if seed % 3 != 0 {
                tracker.heartbeat(&channel, viewers[who].clone());
                last_seen[who] = Some(Instant::now());
            }

            let now = Instant::now();
            let expected = last_seen
                .iter()
                .flatten()
                .filter(|seen| now.duration_since(**seen) <= TTL)
                .count();
            assert_eq!(tracker.count(&channel), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_leave_removes_immediately() {
        let tracker = PresenceTracker::new(TTL);
        let (channel, v1, v2) = ids();

        tracker.heartbeat(&channel, v1.clone());
        tracker.heartbeat(&channel, v2.clone());

        assert!(tracker.leave(&channel, &v1));
        assert!(!tracker.leave(&channel, &v1));
        assert_eq!(tracker.count(&channel), 1);

        assert!(tracker.leave(&channel, &v2));
        assert_eq!(tracker.channel_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_prunes_all_channels() {
        let tracker = PresenceTracker::new(TTL);
        let (_, v1, v2) = ids();
        let a = ChannelId::from("a");
        let b = ChannelId::from("b");

        tracker.heartbeat(&a, v1.clone());
        tracker.heartbeat(&b, v2);
        tokio::time::advance(Duration::from_secs(35)).await;
        tracker.heartbeat(&a, v1);
        tokio::time::advance(Duration::from_secs(10)).await;

        assert_eq!(tracker.sweep(), 1);
        assert_eq!(tracker.channel_count(), 1);
        assert_eq!(tracker.count(&a), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_on_cancel() {
        let tracker = PresenceTracker::new(TTL);
        let cancel = CancellationToken::new();
        let handle = tracker.spawn_sweeper(Duration::from_secs(5), cancel.clone());

        tracker.heartbeat(&ChannelId::from("a"), ViewerId::from("v"));
        tokio::time::sleep(TTL + Duration::from_secs(6)).await;
        assert_eq!(tracker.channel_count(), 0);

        cancel.cancel();
        handle.await.unwrap();
    }
}
