//! Crossfade curve and broadcaster-side fade trigger bookkeeping
//!
//! The broadcaster computes a [`FadeTrigger`] once and repeats it verbatim in
//! every sync until the fade completes locally. Viewers evaluate the same
//! curve against their own wall clock, so polling cadence never affects the
//! shape of the fade.

use crate::models::{FadeTrigger, CROSSFADE_MAX};

/// Quadratic ease-in-out on `[0, 1]`
#[must_use]
pub fn ease_in_out_quad(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    if p < 0.5 {
        2.0 * p * p
    } else {
        1.0 - (-2.0 * p + 2.0).powi(2) / 2.0
    }
}

/// Linear progress of a fade at `now_ms`, clamped to `[0, 1]`
#[must_use]
pub fn progress(trigger: &FadeTrigger, now_ms: i64) -> f64 {
    if trigger.duration_ms <= 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let raw = (now_ms - trigger.started_at) as f64 / trigger.duration_ms as f64;
    raw.clamp(0.0, 1.0)
}

/// Crossfade value of a fade at `now_ms`.
///
/// Returns exactly `end_value` once `now_ms >= started_at + duration_ms`.
#[must_use]
pub fn sample(trigger: &FadeTrigger, now_ms: i64) -> f64 {
    let p = progress(trigger, now_ms);
    if p >= 1.0 {
        return f64::from(trigger.end_value);
    }
    let start = f64::from(trigger.start_value);
    let end = f64::from(trigger.end_value);
    start + (end - start) * ease_in_out_quad(p)
}

/// Round a sampled crossfade onto the integer wire range
#[must_use]
pub fn to_wire_value(value: f64) -> i32 {
    #[allow(clippy::cast_possible_truncation)]
    let rounded = value.round() as i32;
    rounded.clamp(0, CROSSFADE_MAX)
}

/// Broadcaster-side owner of the current fade descriptor
#[derive(Debug, Clone, Default)]
pub struct FadeTriggerGenerator {
    active: Option<FadeTrigger>,
}

impl FadeTriggerGenerator {
    #[must_use]
    pub const fn new() -> Self {
        Self { active: None }
    }

    /// Start a new fade, replacing any fade still in flight
    pub fn begin(
        &mut self,
        now_ms: i64,
        start_value: i32,
        end_value: i32,
        duration_ms: i64,
    ) -> FadeTrigger {
        let trigger = FadeTrigger {
            started_at: now_ms,
            start_value: start_value.clamp(0, CROSSFADE_MAX),
            end_value: end_value.clamp(0, CROSSFADE_MAX),
            duration_ms: duration_ms.max(0),
        };
        if let Some(previous) = self.active.replace(trigger) {
            tracing::debug!(
                previous_started_at = previous.started_at,
                started_at = trigger.started_at,
                "Fade superseded by a new fade"
            );
        }
        trigger
    }

    /// The descriptor to embed in a sync at `now_ms`, if still in flight
    #[must_use]
    pub fn active(&self, now_ms: i64) -> Option<FadeTrigger> {
        self.active.filter(|t| !t.is_complete(now_ms))
    }

    #[must_use]
    pub fn is_fading(&self, now_ms: i64) -> bool {
        self.active(now_ms).is_some()
    }

    /// Resolve the `(crossfade_value, fade_trigger)` pair for the next sync.
    ///
    /// While a fade runs the trigger is repeated unchanged. Once it completes
    /// the trigger is dropped and the crossfade settles on its `end_value`.
    pub fn settle(&mut self, now_ms: i64, current_value: i32) -> (i32, Option<FadeTrigger>) {
        match self.active {
            Some(trigger) if trigger.is_complete(now_ms) => {
                self.active = None;
                (trigger.end_value, None)
            }
            Some(trigger) => (to_wire_value(trigger.value_at(now_ms)), Some(trigger)),
            None => (current_value, None),
        }
    }

    /// Abandon the current fade without settling it
    pub fn cancel(&mut self) -> Option<FadeTrigger> {
        self.active.take()
    }
}
