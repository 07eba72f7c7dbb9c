use std::{
    cell::Cell,
    path::{Path, PathBuf},
    time::Duration,
};

use super::{EngineState, MediaEngine};
use crate::{Result, StudyError};

/// Deterministic, clock-free media player.
///
/// Time only moves when [`SimulatedEngine::advance`] is called. Like real
/// players, it leaves the media in an unusable `Ended` state after natural
/// end of stream: `play`, `pause` and seeks are ignored until `stop`.
///
/// `transition_lag` delays play/pause requests by a number of state polls to
/// mimic players that switch state asynchronously.
#[derive(Debug)]
pub struct SimulatedEngine {
    media: Option<PathBuf>,
    media_length_ms: u64,
    length_ms: u64,
    time_ms: u64,
    state: Cell<EngineState>,
    pending: Cell<Option<(EngineState, u32)>>,
    transition_lag: u32,
}

impl SimulatedEngine {
    /// Creates a player whose media all report `length` once parsed.
    pub fn new(length: Duration) -> Self {
        Self {
            media: None,
            media_length_ms: length.as_millis() as u64,
            length_ms: 0,
            time_ms: 0,
            state: Cell::new(EngineState::NothingSpecial),
            pending: Cell::new(None),
            transition_lag: 0,
        }
    }

    pub fn with_transition_lag(mut self, polls: u32) -> Self {
        self.transition_lag = polls;
        self
    }

    /// Lets `elapsed` of playback pass. Reaching the end of the media puts the
    /// player into the `Ended` state.
    pub fn advance(&mut self, elapsed: Duration) {
        self.settle();
        if self.state.get() != EngineState::Playing {
            return;
        }

        self.time_ms = self
            .time_ms
            .saturating_add(elapsed.as_millis() as u64)
            .min(self.length_ms);
        if self.time_ms >= self.length_ms {
            self.state.set(EngineState::Ended);
        }
    }

    fn request(&self, target: EngineState) {
        if self.transition_lag == 0 {
            self.state.set(target);
            self.pending.set(None);
        } else {
            self.pending.set(Some((target, self.transition_lag)));
        }
    }

    fn settle(&self) {
        if let Some((target, _)) = self.pending.take() {
            self.state.set(target);
        }
    }

    fn is_ended(&self) -> bool {
        self.state.get() == EngineState::Ended
    }
}

impl MediaEngine for SimulatedEngine {
    fn open(&mut self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(StudyError::media("empty media path"));
        }

        self.media = Some(path.to_path_buf());
        self.length_ms = 0;
        self.time_ms = 0;
        self.pending.set(None);
        self.state.set(EngineState::NothingSpecial);
        Ok(())
    }

    fn parse(&mut self) -> Result<()> {
        let Some(path) = &self.media else {
            return Err(StudyError::media("no media opened"));
        };
        if self.media_length_ms == 0 {
            return Err(StudyError::media(format!(
                "could not determine the duration of {}",
                path.display()
            )));
        }

        self.length_ms = self.media_length_ms;
        Ok(())
    }

    fn has_media(&self) -> bool {
        self.media.is_some()
    }

    fn play(&mut self) -> Result<()> {
        if self.media.is_none() {
            return Err(StudyError::media("no media loaded"));
        }
        if !self.is_ended() {
            self.request(EngineState::Playing);
        }
        Ok(())
    }

    fn pause(&mut self) {
        if self.media.is_some() && !self.is_ended() {
            self.request(EngineState::Paused);
        }
    }

    fn stop(&mut self) {
        if self.media.is_some() {
            self.pending.set(None);
            self.state.set(EngineState::Stopped);
            self.time_ms = 0;
        }
    }

    fn state(&self) -> EngineState {
        if let Some((target, remaining)) = self.pending.get() {
            if remaining <= 1 {
                self.settle();
            } else {
                self.pending.set(Some((target, remaining - 1)));
            }
        }
        self.state.get()
    }

    fn time_ms(&self) -> Option<u64> {
        self.media.as_ref().map(|_| self.time_ms)
    }

    fn set_time_ms(&mut self, time_ms: u64) {
        if self.media.is_some() && !self.is_ended() {
            self.time_ms = time_ms.min(self.length_ms);
        }
    }

    fn position(&self) -> Option<f64> {
        self.media.as_ref()?;
        if self.length_ms == 0 {
            return Some(0.0);
        }
        Some(self.time_ms as f64 / self.length_ms as f64)
    }

    fn set_position(&mut self, fraction: f64) {
        let target = fraction.clamp(0.0, 1.0) * self.length_ms as f64;
        self.set_time_ms(target as u64);
    }

    fn length_ms(&self) -> Option<u64> {
        self.media.as_ref().map(|_| self.length_ms)
    }
}
