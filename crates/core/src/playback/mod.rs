use std::{
    thread,
    time::{Duration, Instant},
};

use serde::Serialize;

use crate::{EngineState, MediaEngine};

/// Resolution of the position slider; the full media length maps onto
/// `0..=SLIDER_MAX`.
pub const SLIDER_MAX: u32 = 10_000;

/// Largest position ever requested from the engine. Several players reject a
/// seek to exactly 1.0.
pub const MAX_SEEK_POSITION: f64 = 0.99999;

/// Quiet period a scrub has to settle for before it is committed as a seek.
pub const SCRUB_DEBOUNCE: Duration = Duration::from_millis(500);

/// Session-level view of the player, derived from the engine on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    NoMedia,
    Stopped,
    Paused,
    Playing,
}

impl PlaybackState {
    pub fn from_engine<E: MediaEngine + ?Sized>(engine: &E) -> Self {
        if !engine.has_media() {
            return Self::NoMedia;
        }

        match engine.state() {
            EngineState::Playing => Self::Playing,
            EngineState::Paused => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

/// Bounds for the end-of-media recovery handshake.
///
/// Recovery runs on the caller's thread and waits twice (for playing, then
/// for paused), so it blocks for at most [`RecoveryPolicy::max_blocking`].
/// The default caps that at 400 ms.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryPolicy {
    pub max_polls: u32,
    pub poll_interval: Duration,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            max_polls: 20,
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl RecoveryPolicy {
    /// Longest time a full recovery attempt can sleep before giving up.
    pub fn max_blocking(&self) -> Duration {
        self.poll_interval.saturating_mul(self.max_polls.saturating_mul(2))
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingSeek {
    value: u32,
    requested_at: Instant,
}

/// Keeps the position slider and the engine in agreement.
///
/// Engine-driven updates go through [`PlaybackSynchronizer::set_slider_silently`]
/// and never produce seeks. User scrubs are debounced: only the last value of
/// a burst is committed, once [`SCRUB_DEBOUNCE`] has passed without further
/// input, and engine-to-slider sync is suspended until then.
#[derive(Debug, Clone)]
pub struct PlaybackSynchronizer {
    slider: u32,
    pending: Option<PendingSeek>,
    debounce: Duration,
    recovery: RecoveryPolicy,
}

impl Default for PlaybackSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSynchronizer {
    pub fn new() -> Self {
        Self {
            slider: 0,
            pending: None,
            debounce: SCRUB_DEBOUNCE,
            recovery: RecoveryPolicy::default(),
        }
    }

    pub fn with_recovery_policy(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn slider_value(&self) -> u32 {
        self.slider
    }

    pub fn has_pending_seek(&self) -> bool {
        self.pending.is_some()
    }

    pub fn reset(&mut self) {
        self.slider = 0;
        self.pending = None;
    }

    /// Moves the slider without scheduling a seek.
    pub fn set_slider_silently(&mut self, value: u32) {
        self.slider = value.min(SLIDER_MAX);
    }

    /// Records a user-initiated slider change. The seek itself happens in
    /// [`PlaybackSynchronizer::commit_due_seek`].
    pub fn on_slider_changed(&mut self, value: u32, now: Instant) {
        let value = value.min(SLIDER_MAX);
        self.slider = value;
        self.pending = Some(PendingSeek {
            value,
            requested_at: now,
        });
    }

    /// Issues the pending scrub as a seek once it has settled. Returns whether
    /// a seek was sent to the engine.
    pub fn commit_due_seek<E: MediaEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        now: Instant,
    ) -> bool {
        let Some(pending) = self.pending else {
            return false;
        };
        if now.saturating_duration_since(pending.requested_at) < self.debounce {
            return false;
        }

        self.pending = None;
        if !engine.has_media() {
            return false;
        }

        let position = slider_to_position(pending.value);
        tracing::debug!(slider = pending.value, position, "committing scrub");
        engine.set_position(position);
        true
    }

    /// Mirrors the engine position onto the slider. Skipped while a scrub is
    /// pending or while the media length is unknown.
    pub fn sync_from_engine<E: MediaEngine + ?Sized>(&mut self, engine: &E) -> Option<u32> {
        if self.pending.is_some() {
            return None;
        }

        let time_ms = engine.time_ms()?;
        let length_ms = engine.length_ms().filter(|len| *len > 0)?;
        let value = slider_from_time(time_ms, length_ms);
        self.set_slider_silently(value);
        Some(value)
    }

    /// Seeks relative to the current time, clamped to `[0, length]`. Any
    /// pending scrub is discarded. Returns the target time in milliseconds.
    pub fn seek_by_seconds<E: MediaEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        delta_seconds: i64,
    ) -> Option<u64> {
        let time_ms = engine.time_ms()?;
        let length_ms = engine.length_ms().filter(|len| *len > 0)?;

        let target = (time_ms as i64)
            .saturating_add(delta_seconds.saturating_mul(1000))
            .clamp(0, length_ms as i64) as u64;

        self.pending = None;
        engine.set_time_ms(target);
        self.set_slider_silently(slider_from_time(target, length_ms));
        Some(target)
    }

    /// Brings the engine from its post end-of-stream state back to a paused,
    /// seekable state just before the end: stop, play, wait for playing,
    /// pause, wait for paused, seek. Each wait is bounded by the
    /// [`RecoveryPolicy`]; on timeout the attempt is abandoned and `false`
    /// is returned.
    pub fn recover_from_end<E: MediaEngine + ?Sized>(&mut self, engine: &mut E) -> bool {
        self.pending = None;
        engine.stop();

        if let Err(err) = engine.play() {
            tracing::warn!(%err, "could not restart playback after end of media");
            return false;
        }
        if !self.wait_for(engine, EngineState::Playing) {
            tracing::warn!(
                polls = self.recovery.max_polls,
                "engine never reported playing during end-of-media recovery"
            );
            return false;
        }

        engine.pause();
        if !self.wait_for(engine, EngineState::Paused) {
            tracing::warn!(
                polls = self.recovery.max_polls,
                "engine never reported paused during end-of-media recovery"
            );
            return false;
        }

        engine.set_position(MAX_SEEK_POSITION);
        self.set_slider_silently(SLIDER_MAX);
        tracing::debug!("recovered from end of media");
        true
    }

    fn wait_for<E: MediaEngine + ?Sized>(&self, engine: &E, target: EngineState) -> bool {
        for _ in 0..self.recovery.max_polls {
            if engine.state() == target {
                return true;
            }
            if !self.recovery.poll_interval.is_zero() {
                thread::sleep(self.recovery.poll_interval);
            }
        }
        false
    }
}

/// Converts a slider value into an engine position, never past
/// [`MAX_SEEK_POSITION`].
pub fn slider_to_position(value: u32) -> f64 {
    (f64::from(value) / f64::from(SLIDER_MAX)).min(MAX_SEEK_POSITION)
}

pub fn slider_from_time(time_ms: u64, length_ms: u64) -> u32 {
    if length_ms == 0 {
        return 0;
    }
    let scaled = time_ms.min(length_ms) * u64::from(SLIDER_MAX) / length_ms;
    scaled as u32
}
