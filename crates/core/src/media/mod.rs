//! Capability interface over the native media player.
//!
//! The session never talks to a concrete player directly; everything goes
//! through [`MediaEngine`] so the sampling loop can be driven deterministically
//! by [`SimulatedEngine`] in tests and in the headless application.

mod simulated;

use std::path::Path;

use serde::Serialize;

use crate::Result;

pub use simulated::SimulatedEngine;

/// Player status as reported by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    NothingSpecial,
    Opening,
    Buffering,
    Playing,
    Paused,
    Stopped,
    Ended,
    Error,
}

/// Synchronous command/query surface of a media player.
///
/// Queries return `None` when no media is loaded. Commands issued without
/// media are ignored by implementations rather than reported as errors.
pub trait MediaEngine {
    /// Associates the player with a media file.
    fn open(&mut self, path: &Path) -> Result<()>;

    /// Parses the opened media so its duration becomes known. May block.
    fn parse(&mut self) -> Result<()>;

    fn has_media(&self) -> bool;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn stop(&mut self);

    fn state(&self) -> EngineState;

    fn is_playing(&self) -> bool {
        self.state() == EngineState::Playing
    }

    /// Current playback time in milliseconds.
    fn time_ms(&self) -> Option<u64>;

    fn set_time_ms(&mut self, time_ms: u64);

    /// Current position as a fraction of the media length.
    fn position(&self) -> Option<f64>;

    fn set_position(&mut self, fraction: f64);

    /// Total media length in milliseconds. May be `Some(0)` before parsing.
    fn length_ms(&self) -> Option<u64>;
}
