use std::time::{Duration, Instant};

use crate::RatingRange;

/// Quiet period after the last manual change before the rating starts to
/// relax towards zero.
pub const DECAY_DELAY: Duration = Duration::from_secs(2);

/// Current rating together with the bookkeeping for the auto-return policy.
///
/// `locked` is set while an increase/decrease control is held down so that
/// auto-repeat presses never race the decay step.
#[derive(Debug, Clone)]
pub struct RatingState {
    value: i32,
    range: RatingRange,
    locked: bool,
    decay_enabled: bool,
    last_manual_change: Option<Instant>,
}

impl RatingState {
    /// Starts at zero, or at the bound nearest zero when the range excludes it.
    pub fn new(range: RatingRange, decay_enabled: bool) -> Self {
        Self {
            value: range.clamp(0),
            range,
            locked: false,
            decay_enabled,
            last_manual_change: None,
        }
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn range(&self) -> RatingRange {
        self.range
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn decay_enabled(&self) -> bool {
        self.decay_enabled
    }

    /// Moves the rating one step up. Saturates at the upper bound but still
    /// locks the rating and refreshes the manual-change timestamp.
    pub fn increase(&mut self, now: Instant) {
        if self.value < self.range.upper() {
            self.value += 1;
        }
        self.touch(now);
    }

    /// Moves the rating one step down, saturating at the lower bound.
    pub fn decrease(&mut self, now: Instant) {
        if self.value > self.range.lower() {
            self.value -= 1;
        }
        self.touch(now);
    }

    /// Called when the increase/decrease control is let go.
    pub fn release(&mut self) {
        self.locked = false;
    }

    /// Nudges the rating one step towards zero when the policy is enabled, the
    /// controls are released, a new playback second has started and the user
    /// has been idle for at least [`DECAY_DELAY`]. A range that excludes zero
    /// stops the decay at its nearest bound. Returns whether the value changed.
    pub fn apply_decay_if_due(&mut self, now: Instant, second_boundary_crossed: bool) -> bool {
        if !self.decay_enabled || self.locked || !second_boundary_crossed {
            return false;
        }

        let idle_long_enough = self
            .last_manual_change
            .map_or(true, |at| now.saturating_duration_since(at) >= DECAY_DELAY);
        if !idle_long_enough {
            return false;
        }

        let before = self.value;
        self.value = self.range.clamp(self.value - self.value.signum());
        before != self.value
    }

    /// Replaces the bounds and pulls the current value back inside them.
    pub fn set_range(&mut self, range: RatingRange) {
        self.range = range;
        self.value = range.clamp(self.value);
    }

    pub fn reset(&mut self) {
        self.value = self.range.clamp(0);
        self.locked = false;
        self.last_manual_change = None;
    }

    fn touch(&mut self, now: Instant) {
        self.locked = true;
        self.last_manual_change = Some(now);
    }
}
