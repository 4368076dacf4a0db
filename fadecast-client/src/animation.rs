//! Local replay of broadcaster fades

use fadecast_core::models::FadeTrigger;

/// What a poll did to the local fade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeChange {
    Started(FadeTrigger),
    Cleared,
    Unchanged,
}

/// Tracks the trigger currently being replayed and when the last fade ended.
#[derive(Debug, Clone, Default)]
pub struct FadeAnimator {
    trigger: Option<FadeTrigger>,
    /// Plain crossfade value from the latest snapshot
    base_value: f64,
    last_fade_end_ms: Option<i64>,
}

impl FadeAnimator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            trigger: None,
            base_value: 0.0,
            last_fade_end_ms: None,
        }
    }

    /// Fold one polled `(crossfade_value, fade_trigger)` pair in.
    ///
    /// A trigger is identified by its `started_at`; repeats of the same
    /// trigger leave the running animation untouched.
    pub fn observe(&mut self, trigger: Option<FadeTrigger>, crossfade_value: i32, now_ms: i64) -> FadeChange {
        self.base_value = f64::from(crossfade_value);
        match (self.trigger, trigger) {
            (current, Some(next)) if current.map(|t| t.started_at) != Some(next.started_at) => {
                self.trigger = Some(next);
                self.last_fade_end_ms = Some(next.ends_at());
                FadeChange::Started(next)
            }
            (Some(current), None) => {
                self.trigger = None;
                // Cleared early means the broadcaster cut the fade short
                self.last_fade_end_ms = Some(current.ends_at().min(now_ms));
                FadeChange::Cleared
            }
            _ => FadeChange::Unchanged,
        }
    }

    /// Crossfade position to render at `now_ms`
    #[must_use]
    pub fn value(&self, now_ms: i64) -> f64 {
        self.trigger
            .map_or(self.base_value, |trigger| trigger.value_at(now_ms))
    }

    /// A trigger is held and has not reached its end yet
    #[must_use]
    pub fn in_flight(&self, now_ms: i64) -> bool {
        self.trigger.is_some_and(|t| !t.is_complete(now_ms))
    }

    /// Loads may be issued: no fade running and the cooldown since the last
    /// one has passed
    #[must_use]
    pub fn load_allowed(&self, now_ms: i64, cooldown_ms: i64) -> bool {
        !self.in_flight(now_ms)
            && self
                .last_fade_end_ms
                .is_none_or(|end| now_ms - end >= cooldown_ms)
    }

    #[must_use]
    pub const fn trigger(&self) -> Option<FadeTrigger> {
        self.trigger
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger(started_at: i64) -> FadeTrigger {
        FadeTrigger {
            started_at,
            start_value: 0,
            end_value: 100,
            duration_ms: 8_000,
        }
    }

    #[test]
    fn test_repeated_trigger_does_not_restart() {
        let mut animator = FadeAnimator::new();
        assert!(matches!(
            animator.observe(Some(trigger(1_000)), 0, 1_000),
            FadeChange::Started(_)
        ));
        assert_eq!(
            animator.observe(Some(trigger(1_000)), 40, 3_000),
            FadeChange::Unchanged
        );
        // Local replay ignores the sampled crossfade_value while fading
        assert!((animator.value(5_000) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_clear_snaps_to_plain_value() {
        let mut animator = FadeAnimator::new();
        animator.observe(Some(trigger(1_000)), 0, 1_000);
        assert_eq!(animator.observe(None, 100, 9_500), FadeChange::Cleared);
        assert_eq!(animator.value(9_500), 100.0);
        assert!(!animator.in_flight(9_500));
    }

    #[test]
    fn test_completed_trigger_holds_end_value() {
        let mut animator = FadeAnimator::new();
        animator.observe(Some(trigger(1_000)), 0, 1_000);
        assert_eq!(animator.value(20_000), 100.0);
        assert!(!animator.in_flight(9_000));
    }

    #[test]
    fn test_load_gate_honours_cooldown() {
        let mut animator = FadeAnimator::new();
        assert!(animator.load_allowed(0, 2_000));

        animator.observe(Some(trigger(1_000)), 0, 1_000);
        assert!(!animator.load_allowed(5_000, 2_000));
        assert!(!animator.load_allowed(9_000, 2_000));
        assert!(!animator.load_allowed(10_999, 2_000));
        assert!(animator.load_allowed(11_000, 2_000));
    }

    #[test]
    fn test_early_clear_starts_cooldown_now() {
        let mut animator = FadeAnimator::new();
        animator.observe(Some(trigger(1_000)), 0, 1_000);
        animator.observe(None, 30, 3_000);
        assert!(!animator.load_allowed(4_999, 2_000));
        assert!(animator.load_allowed(5_000, 2_000));
    }

    #[test]
    fn test_trigger_not_yet_started_counts_as_in_flight() {
        let mut animator = FadeAnimator::new();
        animator.observe(Some(trigger(10_000)), 0, 9_000);
        assert!(animator.in_flight(9_000));
        assert_eq!(animator.value(9_000), 0.0);
    }
}
