//! Flattens a captured [`TimeSeries`] into per-second rows and writes them to
//! a spreadsheet with a combined rating/marker chart.

use std::path::Path;

use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Chart, ChartAxisCrossing, ChartType, Workbook};
use serde::Serialize;

use crate::{format_hms, RatingRange, Result, StudyError, TimeSeries};

pub const WORKSHEET_NAME: &str = "Sheet1";
pub const SERIES_NAME: &str = "Psychometric Study";

/// One spreadsheet row: elapsed time, rating and the optional marker cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub time: String,
    pub rating: i32,
    pub marker: Option<i32>,
}

/// Rows plus the bounds the chart axis is pinned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportDocument {
    pub rows: Vec<ExportRow>,
    pub range: RatingRange,
}

impl ExportDocument {
    /// Collapses `series` into rows. Fails with
    /// [`StudyError::NothingToExport`] when nothing was recorded.
    pub fn from_series(series: &TimeSeries, range: RatingRange) -> Result<Self> {
        let sentinel = range.marker_sentinel();
        let rows: Vec<ExportRow> = series
            .collapse()
            .into_iter()
            .map(|row| ExportRow {
                time: format_hms(row.second),
                rating: row.rating,
                marker: row.marker.then_some(sentinel),
            })
            .collect();

        if rows.is_empty() {
            return Err(StudyError::NothingToExport);
        }

        Ok(Self { rows, range })
    }
}

/// Spreadsheet backend capable of persisting an [`ExportDocument`].
pub trait SpreadsheetWriter {
    fn write(&mut self, document: &ExportDocument, path: &Path) -> Result<()>;
}

/// Writes `.xlsx` workbooks: time, rating and marker columns starting at
/// `A1`, with a line chart of the ratings combined with a scatter chart of the
/// markers inserted at `D1`.
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxExporter;

impl SpreadsheetWriter for XlsxExporter {
    fn write(&mut self, document: &ExportDocument, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(WORKSHEET_NAME)?;

        for (index, row) in document.rows.iter().enumerate() {
            let r = index as u32;
            worksheet.write_string(r, 0, row.time.as_str())?;
            worksheet.write_number(r, 1, f64::from(row.rating))?;
            if let Some(marker) = row.marker {
                worksheet.write_number(r, 2, f64::from(marker))?;
            }
        }

        let last_row = document.rows.len().saturating_sub(1) as u32;
        let lower = f64::from(document.range.lower());
        let upper = f64::from(document.range.upper());

        let mut chart = Chart::new(ChartType::Line);
        chart
            .add_series()
            .set_categories((WORKSHEET_NAME, 0, 0, last_row, 0))
            .set_values((WORKSHEET_NAME, 0, 1, last_row, 1))
            .set_name(SERIES_NAME);
        chart.x_axis().set_name("time (sec)");
        chart
            .y_axis()
            .set_name("response")
            .set_min(lower)
            .set_max(upper)
            .set_major_gridlines(true)
            .set_crossing(ChartAxisCrossing::AxisValue(lower));

        let mut markers = Chart::new(ChartType::Scatter);
        markers
            .add_series()
            .set_categories((WORKSHEET_NAME, 0, 0, last_row, 0))
            .set_values((WORKSHEET_NAME, 0, 2, last_row, 2))
            .set_name("Markers");
        chart.combine(&markers);

        worksheet.insert_chart(0, 3, &chart)?;
        workbook.save(path)?;
        Ok(())
    }
}

/// Exports `series` to `path`. Nothing is written when the series is empty.
/// Returns the number of rows written.
pub fn export<W: SpreadsheetWriter + ?Sized>(
    series: &TimeSeries,
    range: RatingRange,
    path: &Path,
    writer: &mut W,
) -> Result<usize> {
    let document = ExportDocument::from_series(series, range)?;
    writer.write(&document, path)?;
    tracing::info!(?path, rows = document.rows.len(), "workbook saved");
    Ok(document.rows.len())
}

/// File name used when the rater has not picked a destination:
/// `"<source file> (<play count>) <YYYY-MM-DD HH-MM-SS>.xlsx"`.
pub fn default_file_name(source: &Path, play_count: u32, at: DateTime<Utc>) -> String {
    let base = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session".to_string());
    format!(
        "{base} ({play_count}) {}.xlsx",
        at.format("%Y-%m-%d %H-%M-%S")
    )
}

/// Opens a saved workbook with the platform's default handler.
pub fn open_exported(path: &Path) {
    if let Err(err) = open::that(path) {
        tracing::warn!(?path, %err, "could not open exported workbook");
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{Marker, Sample};

    #[derive(Default)]
    struct RecordingWriter {
        written: Vec<(ExportDocument, std::path::PathBuf)>,
    }

    impl SpreadsheetWriter for RecordingWriter {
        fn write(&mut self, document: &ExportDocument, path: &Path) -> Result<()> {
            self.written.push((document.clone(), path.to_path_buf()));
            Ok(())
        }
    }

    fn series() -> TimeSeries {
        let mut series = TimeSeries::new();
        series.append(Sample::new(1, 2));
        series.append(Sample::new(2, 3));
        series.append(Sample::new(2, 4));
        series.append_marker(Marker::new(2));
        series
    }

    #[test]
    fn builds_rows_with_sentinel_markers() {
        let document = ExportDocument::from_series(&series(), RatingRange::new(-10, 10)).unwrap();
        assert_eq!(
            document.rows,
            vec![
                ExportRow {
                    time: "0:00:01".into(),
                    rating: 2,
                    marker: None
                },
                ExportRow {
                    time: "0:00:02".into(),
                    rating: 4,
                    marker: Some(0)
                },
            ]
        );
    }

    #[test]
    fn sentinel_sits_on_lower_bound_for_positive_ranges() {
        let document = ExportDocument::from_series(&series(), RatingRange::new(2, 10)).unwrap();
        assert_eq!(document.rows[1].marker, Some(2));
    }

    #[test]
    fn empty_series_is_refused_without_writing() {
        let mut writer = RecordingWriter::default();
        let err = export(
            &TimeSeries::new(),
            RatingRange::default(),
            Path::new("unused.xlsx"),
            &mut writer,
        )
        .unwrap_err();

        assert!(matches!(err, StudyError::NothingToExport));
        assert!(writer.written.is_empty());
    }

    #[test]
    fn markers_alone_are_exportable() {
        let mut series = TimeSeries::new();
        series.append_marker(Marker::new(3));
        let mut writer = RecordingWriter::default();

        let rows = export(&series, RatingRange::default(), Path::new("m.xlsx"), &mut writer)
            .expect("markers alone should export");
        assert_eq!(rows, 1);
        assert_eq!(writer.written[0].0.rows[0].marker, Some(0));
    }

    #[test]
    fn synthesizes_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            default_file_name(Path::new("/videos/interview.mp4"), 2, at),
            "interview.mp4 (2) 2024-03-09 14-05-07.xlsx"
        );
    }

    fn workbook_part(path: &Path, name: &str) -> String {
        use std::io::Read;

        let file = std::fs::File::open(path).expect("workbook should exist");
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut contents = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        contents
    }

    #[test]
    fn writes_real_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ratings.xlsx");

        let rows = export(&series(), RatingRange::default(), &path, &mut XlsxExporter).unwrap();
        assert_eq!(rows, 2);

        let sheet = workbook_part(&path, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"r="A1""#));
        assert!(sheet.contains(r#"r="B2""#));
        assert!(sheet.contains(r#"r="C2""#));
        assert!(!sheet.contains(r#"r="C1""#), "unmarked row must leave column C blank");
    }

    #[test]
    fn chart_is_pinned_to_rating_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ratings.xlsx");
        export(&series(), RatingRange::default(), &path, &mut XlsxExporter).unwrap();

        let chart = workbook_part(&path, "xl/charts/chart1.xml");
        assert!(chart.contains("<c:lineChart>"));
        assert!(chart.contains("<c:scatterChart>"));
        assert!(chart.contains("Markers"));
        assert!(chart.contains(SERIES_NAME));
        assert!(chart.contains("response"));
        assert!(chart.contains("time (sec)"));
        assert!(chart.contains(r#"<c:min val="-10"/>"#));
        assert!(chart.contains(r#"<c:max val="10"/>"#));
        assert!(chart.contains(r#"<c:crossesAt val="-10"/>"#));
        assert!(chart.contains("<c:majorGridlines/>"));

        let drawing = workbook_part(&path, "xl/drawings/drawing1.xml");
        let from = drawing.find("<xdr:from>").unwrap();
        let to = drawing.find("</xdr:from>").unwrap();
        let anchor = &drawing[from..to];
        assert!(anchor.contains("<xdr:col>3</xdr:col>"), "{anchor}");
        assert!(anchor.contains("<xdr:row>0</xdr:row>"), "{anchor}");
    }

    #[test]
    fn chart_follows_range_excluding_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ratings.xlsx");
        export(&series(), RatingRange::new(2, 10), &path, &mut XlsxExporter).unwrap();

        let chart = workbook_part(&path, "xl/charts/chart1.xml");
        assert!(chart.contains(r#"<c:min val="2"/>"#));
        assert!(chart.contains(r#"<c:max val="10"/>"#));
        assert!(chart.contains(r#"<c:crossesAt val="2"/>"#));
    }

    #[test]
    fn unwritable_destination_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("ratings.xlsx");

        let err = export(&series(), RatingRange::default(), &path, &mut XlsxExporter).unwrap_err();
        assert!(matches!(err, StudyError::Export(_)), "{err:?}");
        assert!(!path.exists());
    }
}
