use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use chrono::Utc;
use serde::Serialize;

use crate::{
    control_states, default_file_name, export, is_enabled, open_exported, spec_for, Control,
    ControlContext, ControlStatus, Input, Marker, MediaEngine, PlaybackState,
    PlaybackSynchronizer, RatingRange, RatingState, Result, Sampler, SpreadsheetWriter,
    StudyConfig, StudyError, TickReport, TimeSeries, XlsxExporter,
};

pub const APP_NAME: &str = "Psychometric Study";

/// Result of a tick as seen by a front end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionTick {
    #[serde(flatten)]
    pub report: TickReport,
    pub rating: i32,
    pub controls: Vec<ControlStatus>,
    pub title: String,
    /// Destination of an automatic save triggered by end of media.
    pub auto_saved: Option<PathBuf>,
}

/// One rating session over one media file at a time.
///
/// All state is owned per instance and every mutation happens through
/// `&mut self`, either from discrete input events or from [`Session::tick`].
pub struct Session<E: MediaEngine> {
    engine: E,
    config: StudyConfig,
    series: TimeSeries,
    rating: RatingState,
    sync: PlaybackSynchronizer,
    sampler: Sampler,
    writer: Box<dyn SpreadsheetWriter>,
    source: Option<PathBuf>,
    destination: Option<PathBuf>,
    play_count: u32,
    dirty: bool,
}

impl<E: MediaEngine> Session<E> {
    pub fn new(engine: E, config: StudyConfig) -> Self {
        Self::with_writer(engine, config, Box::new(XlsxExporter))
    }

    pub fn with_writer(engine: E, config: StudyConfig, writer: Box<dyn SpreadsheetWriter>) -> Self {
        let rating = RatingState::new(config.rating_range(), config.auto_return_ratings_to_zero);
        let destination = config.default_excel_path.as_ref().map(PathBuf::from);
        Self {
            engine,
            config,
            series: TimeSeries::new(),
            rating,
            sync: PlaybackSynchronizer::new(),
            sampler: Sampler::new(),
            writer,
            source: None,
            destination,
            play_count: 0,
            dirty: false,
        }
    }

    pub fn with_synchronizer(mut self, sync: PlaybackSynchronizer) -> Self {
        self.sync = sync;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    pub fn rating(&self) -> &RatingState {
        &self.rating
    }

    pub fn range(&self) -> RatingRange {
        self.rating.range()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn play_count(&self) -> u32 {
        self.play_count
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    pub fn slider_value(&self) -> u32 {
        self.sync.slider_value()
    }

    pub fn playback_state(&self) -> PlaybackState {
        if self.source.is_none() {
            return PlaybackState::NoMedia;
        }
        PlaybackState::from_engine(&self.engine)
    }

    pub fn controls(&self) -> Vec<ControlStatus> {
        control_states(&ControlContext::new(self.playback_state()))
    }

    pub fn window_title(&self) -> String {
        let mut title = match self.source.as_deref().and_then(Path::file_name) {
            Some(name) => format!("{APP_NAME} - {}", name.to_string_lossy()),
            None => APP_NAME.to_string(),
        };
        if self.dirty {
            title.push('*');
        }
        title
    }

    /// Loads the configured default video, if any.
    pub fn open_default_media(&mut self) -> Result<()> {
        match self.config.default_video_path.clone() {
            Some(path) => self.load_media(path),
            None => Ok(()),
        }
    }

    /// Opens and parses `path`, discarding everything recorded for the
    /// previous file. On failure the session is left without media.
    pub fn load_media(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.engine.has_media() {
            self.engine.stop();
        }

        self.source = None;
        self.series.clear();
        self.rating.reset();
        self.sync.reset();
        self.sampler.reset();
        self.dirty = false;
        self.play_count = 0;

        self.engine.open(path)?;
        self.engine.parse()?;
        let length_ms = self.engine.length_ms().unwrap_or(0);
        if length_ms == 0 {
            return Err(StudyError::media(format!(
                "{} has no playable duration",
                path.display()
            )));
        }

        tracing::info!(
            ?path,
            length_ms,
            decay = self.rating.decay_enabled(),
            "media loaded"
        );
        self.source = Some(path.to_path_buf());
        Ok(())
    }

    /// Presses a control, honouring its enablement predicate.
    pub fn press(&mut self, control: Control, now: Instant) -> Result<()> {
        let ctx = ControlContext::new(self.playback_state());
        if !is_enabled(control, &ctx) {
            tracing::debug!(?control, "ignoring press on disabled control");
            return Ok(());
        }
        match spec_for(control) {
            Some(spec) => self.handle(spec.on_press.clone(), now),
            None => Ok(()),
        }
    }

    /// Releases a control. Release handlers run even if the control became
    /// disabled while held so the rating never stays locked.
    pub fn release(&mut self, control: Control, now: Instant) -> Result<()> {
        match spec_for(control).and_then(|spec| spec.on_release.clone()) {
            Some(input) => self.handle(input, now),
            None => Ok(()),
        }
    }

    /// Applies one input event.
    pub fn handle(&mut self, input: Input, now: Instant) -> Result<()> {
        match input {
            Input::TogglePlay => self.toggle_play(),
            Input::Play => self.play(),
            Input::Pause => {
                self.pause();
                Ok(())
            }
            Input::Stop => {
                self.stop();
                Ok(())
            }
            Input::StepBack => {
                self.seek_by_seconds(-1);
                Ok(())
            }
            Input::StepForward => {
                self.seek_by_seconds(1);
                Ok(())
            }
            Input::Skip => {
                self.skip();
                Ok(())
            }
            Input::Increase => {
                self.increase(now);
                Ok(())
            }
            Input::Decrease => {
                self.decrease(now);
                Ok(())
            }
            Input::Release => {
                self.release_rating();
                Ok(())
            }
            Input::AddMarker => {
                self.add_marker();
                Ok(())
            }
            Input::Scrub { value } => {
                self.scrub(value, now);
                Ok(())
            }
            Input::SetRange { lower, upper } => {
                self.set_range(lower, upper);
                Ok(())
            }
            Input::Save => self.save().map(|_| ()),
            Input::SaveAs { path } => self.save_as(path).map(|_| ()),
            Input::DeleteData { confirmed } => {
                self.delete_data(confirmed);
                Ok(())
            }
        }
    }

    pub fn toggle_play(&mut self) -> Result<()> {
        if self.engine.is_playing() {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    pub fn play(&mut self) -> Result<()> {
        if self.source.is_none() {
            tracing::debug!("play requested without media");
            return Ok(());
        }
        self.engine.play()?;
        self.sampler.activate();
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.source.is_some() {
            self.engine.pause();
        }
    }

    /// Stops playback and rewinds. Recorded data is kept.
    pub fn stop(&mut self) {
        if self.source.is_none() {
            return;
        }
        self.engine.stop();
        self.sync.reset();
        self.sampler.reset();
        self.rating.reset();
    }

    pub fn seek_by_seconds(&mut self, delta_seconds: i64) -> Option<u64> {
        self.source.as_ref()?;
        self.sync.seek_by_seconds(&mut self.engine, delta_seconds)
    }

    /// Jumps forward by the configured skip length, stopping at the end.
    pub fn skip(&mut self) -> Option<u64> {
        let seconds = i64::from(self.config.skip_time_in_sec);
        self.seek_by_seconds(seconds)
    }

    pub fn increase(&mut self, now: Instant) {
        if self.source.is_some() {
            self.rating.increase(now);
        }
    }

    pub fn decrease(&mut self, now: Instant) {
        if self.source.is_some() {
            self.rating.decrease(now);
        }
    }

    pub fn release_rating(&mut self) {
        self.rating.release();
    }

    /// Flags the current playback second.
    pub fn add_marker(&mut self) {
        if self.source.is_none() {
            return;
        }
        if let Some(time_ms) = self.engine.time_ms() {
            let second = (time_ms / 1000) as u32;
            self.series.append_marker(Marker::new(second));
            self.dirty = true;
            tracing::debug!(second, "marker added");
        }
    }

    pub fn scrub(&mut self, value: u32, now: Instant) {
        if self.source.is_some() {
            self.sync.on_slider_changed(value, now);
        }
    }

    pub fn set_range(&mut self, lower: i32, upper: i32) {
        let range = RatingRange::new(lower, upper);
        tracing::info!(lower = range.lower(), upper = range.upper(), "rating range updated");
        self.rating.set_range(range);
    }

    /// Discards all recorded ratings and markers when `confirmed`.
    pub fn delete_data(&mut self, confirmed: bool) {
        if !confirmed {
            return;
        }
        self.series.clear();
        self.dirty = false;
        tracing::info!("recorded data deleted");
    }

    /// Saves to the current destination, synthesizing a file name next to the
    /// working directory when none has been chosen yet.
    pub fn save(&mut self) -> Result<PathBuf> {
        let path = match &self.destination {
            Some(path) => path.clone(),
            None => {
                let source = self.source.as_deref().unwrap_or_else(|| Path::new("session"));
                PathBuf::from(default_file_name(source, self.play_count, Utc::now()))
            }
        };
        self.write_to(path)
    }

    /// Saves to `path` and makes it the destination for later saves.
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<PathBuf> {
        self.write_to(path.into())
    }

    fn write_to(&mut self, path: PathBuf) -> Result<PathBuf> {
        export(&self.series, self.rating.range(), &path, self.writer.as_mut())?;

        self.destination = Some(path.clone());
        self.dirty = false;
        self.play_count += 1;
        if self.config.open_after_save {
            open_exported(&path);
        }
        Ok(path)
    }

    /// Runs one sampling tick and, when configured, saves automatically once
    /// playback reaches the end of the media.
    pub fn tick(&mut self, now: Instant) -> SessionTick {
        let report = if self.source.is_some() {
            self.sampler.tick(
                &mut self.engine,
                &mut self.series,
                &mut self.rating,
                &mut self.sync,
                now,
            )
        } else {
            TickReport::no_media(self.sync.slider_value())
        };

        if report.sample.is_some() {
            self.dirty = true;
        }

        let mut auto_saved = None;
        if report.ended && self.config.auto_save_on_end && self.dirty {
            match self.save() {
                Ok(path) => auto_saved = Some(path),
                Err(err) => tracing::error!(%err, "automatic save at end of media failed"),
            }
        }

        SessionTick {
            rating: self.rating.value(),
            controls: control_states(&ControlContext::new(report.playback)),
            title: self.window_title(),
            report,
            auto_saved,
        }
    }
}
