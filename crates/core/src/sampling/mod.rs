use std::time::{Duration, Instant};

use serde::Serialize;

use crate::{
    format_hms, EngineState, MediaEngine, PlaybackState, PlaybackSynchronizer, RatingState, Sample,
    TimeSeries,
};

/// Period of the sampling tick.
pub const TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Everything a front end needs to refresh itself after one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub playback: PlaybackState,
    pub elapsed_seconds: Option<u32>,
    pub length_seconds: Option<u32>,
    pub slider: u32,
    /// Sample appended during this tick, if a new second started.
    pub sample: Option<Sample>,
    pub decayed: bool,
    /// The engine reported natural end of media during this tick.
    pub ended: bool,
    /// End-of-media recovery left the engine paused just before the end.
    pub recovered: bool,
}

impl TickReport {
    fn idle(playback: PlaybackState, slider: u32) -> Self {
        Self {
            playback,
            elapsed_seconds: None,
            length_seconds: None,
            slider,
            sample: None,
            decayed: false,
            ended: false,
            recovered: false,
        }
    }

    pub fn no_media(slider: u32) -> Self {
        Self::idle(PlaybackState::NoMedia, slider)
    }

    pub fn elapsed_label(&self) -> String {
        format_hms(self.elapsed_seconds.unwrap_or(0))
    }

    pub fn length_label(&self) -> String {
        format_hms(self.length_seconds.unwrap_or(0))
    }
}

/// Per-second sampling cursor.
///
/// The sampler is the only place that appends time-indexed samples. It goes
/// inactive after end of media so a stuck engine is not recovered on every
/// tick; [`Sampler::activate`] is called again on the next play request.
#[derive(Debug, Clone, Default)]
pub struct Sampler {
    prev_second: u32,
    active: bool,
}

impl Sampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn reset(&mut self) {
        self.prev_second = 0;
        self.active = false;
    }

    /// Runs one sampling step:
    ///
    /// 1. commits a settled scrub, otherwise mirrors the engine onto the slider
    /// 2. appends a sample with the current rating when a new whole second
    ///    started while playing, then applies the decay policy
    /// 3. recovers the engine when it reports natural end of media
    pub fn tick<E: MediaEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        series: &mut TimeSeries,
        rating: &mut RatingState,
        sync: &mut PlaybackSynchronizer,
        now: Instant,
    ) -> TickReport {
        let playback = PlaybackState::from_engine(engine);
        if playback == PlaybackState::NoMedia {
            return TickReport::idle(playback, sync.slider_value());
        }

        sync.commit_due_seek(engine, now);
        sync.sync_from_engine(engine);

        let length_ms = engine.length_ms().filter(|len| *len > 0);
        let time_ms = length_ms.and(engine.time_ms());

        let mut report = TickReport::idle(playback, sync.slider_value());
        report.length_seconds = length_ms.map(|len| (len / 1000) as u32);
        report.elapsed_seconds = time_ms.map(|t| (t / 1000) as u32);

        if !self.active {
            return report;
        }

        if let Some(second) = report.elapsed_seconds {
            if playback == PlaybackState::Playing && second != self.prev_second {
                let sample = Sample::new(second, rating.value());
                series.append(sample);
                report.sample = Some(sample);
                report.decayed = rating.apply_decay_if_due(now, true);
                tracing::trace!(second, rating = sample.rating, "sampled");
            }
            self.prev_second = second;
        }

        if engine.state() == EngineState::Ended {
            tracing::info!("end of media reached");
            report.ended = true;
            report.recovered = sync.recover_from_end(engine);
            self.active = false;
            if let Some(time_ms) = engine.time_ms() {
                self.prev_second = (time_ms / 1000) as u32;
            }
            report.playback = PlaybackState::from_engine(engine);
            report.slider = sync.slider_value();
        }

        report
    }
}
