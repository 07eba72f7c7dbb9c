//! Core library for the Psychometric Study application.
//!
//! A rater watches a video while continuously adjusting a bounded rating and
//! flagging discrete markers. This crate owns everything below the window:
//! the captured time series, the rating state machine, synchronisation
//! between the position slider and the media engine, the fixed-period
//! sampling loop and the spreadsheet export. The media player and the
//! spreadsheet backend sit behind traits so the whole loop can be driven
//! deterministically.

pub mod config;
pub mod controls;
pub mod error;
pub mod export;
pub mod media;
pub mod playback;
pub mod rating;
pub mod sampling;
pub mod session;
pub mod timeline;

pub use config::{RatingRange, StudyConfig, DEFAULT_CONFIG_FILE};
pub use controls::{
    control_for_hotkey, control_states, is_enabled, spec_for, Control, ControlContext,
    ControlSpec, ControlStatus, Input, CONTROLS,
};
pub use error::{Result, StudyError};
pub use export::{
    default_file_name, export, open_exported, ExportDocument, ExportRow, SpreadsheetWriter,
    XlsxExporter,
};
pub use media::{EngineState, MediaEngine, SimulatedEngine};
pub use playback::{
    PlaybackState, PlaybackSynchronizer, RecoveryPolicy, MAX_SEEK_POSITION, SCRUB_DEBOUNCE,
    SLIDER_MAX,
};
pub use rating::{RatingState, DECAY_DELAY};
pub use sampling::{Sampler, TickReport, TICK_INTERVAL};
pub use session::{Session, SessionTick, APP_NAME};
pub use timeline::{format_hms, CollapsedRow, Marker, Sample, TimeSeries};
