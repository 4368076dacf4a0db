//! Drift correction policy.
//!
//! A slot is re-seeked to the broadcaster's position when it has wandered
//! further than the threshold, but never more often than the seek cooldown.
//! Seeking is disruptive (the embed rebuffers), so small drift is tolerated.

use fadecast_core::config::ViewerConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftPolicy {
    pub threshold_secs: f64,
    pub seek_cooldown_ms: i64,
}

impl Default for DriftPolicy {
    fn default() -> Self {
        Self {
            threshold_secs: 20.0,
            seek_cooldown_ms: 10_000,
        }
    }
}

impl From<&ViewerConfig> for DriftPolicy {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            threshold_secs: config.drift_threshold_secs,
            seek_cooldown_ms: config.seek_cooldown_ms,
        }
    }
}

impl DriftPolicy {
    /// Whether the previous seek is far enough in the past
    #[must_use]
    pub fn cooled_down(&self, last_seek_ms: Option<i64>, now_ms: i64) -> bool {
        last_seek_ms.is_none_or(|last| now_ms - last > self.seek_cooldown_ms)
    }

    #[must_use]
    pub fn needs_correction(
        &self,
        broadcaster_time: f64,
        local_time: f64,
        last_seek_ms: Option<i64>,
        now_ms: i64,
    ) -> bool {
        (broadcaster_time - local_time).abs() > self.threshold_secs
            && self.cooled_down(last_seek_ms, now_ms)
    }
}
