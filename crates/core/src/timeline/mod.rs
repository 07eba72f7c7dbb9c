use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// One rating observation at a whole playback second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub second: u32,
    pub rating: i32,
}

impl Sample {
    pub fn new(second: u32, rating: i32) -> Self {
        Self { second, rating }
    }
}

/// A discrete event flagged by the rater at a playback second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub second: u32,
}

impl Marker {
    pub fn new(second: u32) -> Self {
        Self { second }
    }
}

/// A single per-second row produced by [`TimeSeries::collapse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CollapsedRow {
    pub second: u32,
    pub rating: i32,
    pub marker: bool,
}

/// In-memory record of everything captured during a session.
///
/// Samples and markers are kept in insertion (playback) order. Duplicate
/// seconds are expected, e.g. after scrubbing backwards, and are only
/// resolved when the series is collapsed.
#[derive(Debug, Default, Clone)]
pub struct TimeSeries {
    samples: Vec<Sample>,
    markers: Vec<Marker>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn append_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.markers.clear();
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.markers.is_empty()
    }

    /// Reduces the raw series to one row per second in ascending order.
    ///
    /// The last sample inserted for a second wins. Markers are OR-ed by
    /// presence. A marked second without any rating sample still gets a row,
    /// carrying the rating of the nearest earlier row (0 if there is none).
    pub fn collapse(&self) -> Vec<CollapsedRow> {
        let mut ratings = BTreeMap::new();
        for sample in &self.samples {
            ratings.insert(sample.second, sample.rating);
        }

        let marked: BTreeSet<u32> = self.markers.iter().map(|m| m.second).collect();
        let seconds: BTreeSet<u32> = ratings.keys().chain(marked.iter()).copied().collect();

        let mut last_rating = 0;
        seconds
            .into_iter()
            .map(|second| {
                let rating = ratings.get(&second).copied().unwrap_or(last_rating);
                last_rating = rating;
                CollapsedRow {
                    second,
                    rating,
                    marker: marked.contains(&second),
                }
            })
            .collect()
    }
}

/// Formats whole seconds as `H:MM:SS`, e.g. `0:01:05`.
pub fn format_hms(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours}:{minutes:02}:{secs:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_elapsed_time() {
        assert_eq!(format_hms(0), "0:00:00");
        assert_eq!(format_hms(65), "0:01:05");
        assert_eq!(format_hms(3_723), "1:02:03");
        assert_eq!(format_hms(36_000), "10:00:00");
    }

    fn row(second: u32, rating: i32, marker: bool) -> CollapsedRow {
        CollapsedRow {
            second,
            rating,
            marker,
        }
    }

    #[test]
    fn last_write_wins_per_second() {
        let mut series = TimeSeries::new();
        series.append(Sample::new(5, 1));
        series.append(Sample::new(5, 3));
        series.append(Sample::new(7, 2));

        assert_eq!(
            series.collapse(),
            vec![row(5, 3, false), row(7, 2, false)]
        );
    }

    #[test]
    fn sorts_out_of_order_samples() {
        let mut series = TimeSeries::new();
        series.append(Sample::new(9, 4));
        series.append(Sample::new(2, -1));
        series.append(Sample::new(3, 0));

        let seconds: Vec<u32> = series.collapse().iter().map(|r| r.second).collect();
        assert_eq!(seconds, vec![2, 3, 9]);
    }

    #[test]
    fn collapse_is_idempotent() {
        let mut series = TimeSeries::new();
        series.append(Sample::new(1, 1));
        series.append(Sample::new(1, 2));
        series.append_marker(Marker::new(4));

        assert_eq!(series.collapse(), series.collapse());
    }

    #[test]
    fn empty_series_collapses_to_nothing() {
        assert!(TimeSeries::new().collapse().is_empty());
    }

    #[test]
    fn duplicate_markers_are_merged() {
        let mut series = TimeSeries::new();
        series.append(Sample::new(3, 1));
        series.append_marker(Marker::new(3));
        series.append_marker(Marker::new(3));

        assert_eq!(series.collapse(), vec![row(3, 1, true)]);
    }

    #[test]
    fn orphan_marker_gets_its_own_row() {
        let mut series = TimeSeries::new();
        series.append(Sample::new(4, 2));
        series.append(Sample::new(6, -3));
        series.append_marker(Marker::new(5));

        assert_eq!(
            series.collapse(),
            vec![row(4, 2, false), row(5, 2, true), row(6, -3, false)]
        );
    }

    #[test]
    fn orphan_marker_before_any_rating_uses_zero() {
        let mut series = TimeSeries::new();
        series.append_marker(Marker::new(0));
        series.append(Sample::new(1, 5));

        assert_eq!(series.collapse(), vec![row(0, 0, true), row(1, 5, false)]);
    }

    #[test]
    fn clear_resets_both_lists() {
        let mut series = TimeSeries::new();
        series.append(Sample::new(1, 1));
        series.append_marker(Marker::new(1));
        series.clear();

        assert!(series.is_empty());
        assert!(series.collapse().is_empty());
    }
}
