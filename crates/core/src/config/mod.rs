use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::Result;

/// File name the application looks for in its working directory.
pub const DEFAULT_CONFIG_FILE: &str = "default.json";

pub const DEFAULT_LOWER_BOUND: i32 = -10;
pub const DEFAULT_UPPER_BOUND: i32 = 10;
pub const DEFAULT_SKIP_SECONDS: u32 = 60;

/// Top-level configuration document. Every key is optional; anything missing
/// falls back to the built-in default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudyConfig {
    pub default_video_path: Option<String>,
    pub default_excel_path: Option<String>,
    pub lower_slider_value: i32,
    pub upper_slider_value: i32,
    pub skip_time_in_sec: u32,
    pub auto_return_ratings_to_zero: bool,
    pub auto_save_on_end: bool,
    pub open_after_save: bool,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            default_video_path: None,
            default_excel_path: None,
            lower_slider_value: DEFAULT_LOWER_BOUND,
            upper_slider_value: DEFAULT_UPPER_BOUND,
            skip_time_in_sec: DEFAULT_SKIP_SECONDS,
            auto_return_ratings_to_zero: false,
            auto_save_on_end: false,
            open_after_save: false,
        }
    }
}

impl StudyConfig {
    /// Reads and parses the configuration document at `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Loads the configuration at `path`, falling back to defaults when the
    /// file is missing or cannot be parsed. Never fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(?path, "config file does not exist, using defaults");
            return Self::default();
        }

        match Self::from_path(path) {
            Ok(config) => {
                tracing::debug!(?path, "loaded configuration");
                config
            }
            Err(err) => {
                tracing::warn!(?path, %err, "failed to load configuration, using defaults");
                Self::default()
            }
        }
    }

    pub fn rating_range(&self) -> RatingRange {
        RatingRange::new(self.lower_slider_value, self.upper_slider_value)
    }
}

/// Closed interval the rating is allowed to move within.
///
/// Constructing a range with `lower > upper` swaps the bounds, so
/// `lower <= upper` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingRange {
    lower: i32,
    upper: i32,
}

impl Default for RatingRange {
    fn default() -> Self {
        Self {
            lower: DEFAULT_LOWER_BOUND,
            upper: DEFAULT_UPPER_BOUND,
        }
    }
}

impl RatingRange {
    pub fn new(lower: i32, upper: i32) -> Self {
        if lower > upper {
            Self {
                lower: upper,
                upper: lower,
            }
        } else {
            Self { lower, upper }
        }
    }

    pub fn lower(&self) -> i32 {
        self.lower
    }

    pub fn upper(&self) -> i32 {
        self.upper
    }

    pub fn contains(&self, value: i32) -> bool {
        (self.lower..=self.upper).contains(&value)
    }

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.lower, self.upper)
    }

    /// Value at which markers are plotted: zero when the range straddles zero,
    /// otherwise the lower bound.
    pub fn marker_sentinel(&self) -> i32 {
        if self.lower < 0 && 0 < self.upper {
            0
        } else {
            self.lower
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn swaps_inverted_bounds() {
        let range = RatingRange::new(5, -5);
        assert_eq!(range.lower(), -5);
        assert_eq!(range.upper(), 5);
    }

    #[test]
    fn marker_sentinel_follows_range() {
        assert_eq!(RatingRange::new(-10, 10).marker_sentinel(), 0);
        assert_eq!(RatingRange::new(2, 10).marker_sentinel(), 2);
        assert_eq!(RatingRange::new(-10, 0).marker_sentinel(), -10);
    }

    #[test]
    fn parses_partial_documents() {
        let config: StudyConfig =
            serde_json::from_str(r#"{ "skipTimeInSec": 15, "autoReturnRatingsToZero": true }"#)
                .unwrap();

        assert_eq!(config.skip_time_in_sec, 15);
        assert!(config.auto_return_ratings_to_zero);
        assert_eq!(config.rating_range(), RatingRange::default());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = StudyConfig::load_or_default(dir.path().join(DEFAULT_CONFIG_FILE));
        assert_eq!(config, StudyConfig::default());
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        assert!(StudyConfig::from_path(file.path()).is_err());
        assert_eq!(
            StudyConfig::load_or_default(file.path()),
            StudyConfig::default()
        );
    }

    #[test]
    fn reads_inverted_range_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{ "lowerSliderValue": 7, "upperSliderValue": 1 }"#)
            .unwrap();

        let config = StudyConfig::load_or_default(file.path());
        assert_eq!(config.rating_range(), RatingRange::new(1, 7));
    }
}
