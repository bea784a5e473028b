use super::*;
use crate::models::{DetectionRecord, Timebin};
use crate::services::diel::FixedSunTimes;
use chrono::{Duration, NaiveDate};

fn ts(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

fn record(
    annotator: &str,
    label: &str,
    start: DateTime<FixedOffset>,
    timebin: u32,
) -> DetectionRecord {
    DetectionRecord {
        dataset: "C2D1_070722".to_string(),
        annotator: annotator.to_string(),
        label: label.to_string(),
        start_time: start,
        end_time: start + Duration::seconds(i64::from(timebin)),
        timebin: Timebin::new(timebin),
    }
}

/// Two annotators on the same afternoon. `mdupont` labels whistles and
/// clicks, `detector` only whistles.
fn sample_table() -> DetectionTable {
    let base = ts("2023-02-11T12:00:00+01:00");
    let mut records = Vec::new();
    for i in 0..6 {
        records.push(record("mdupont", "Whistle", base + Duration::seconds(i * 10), 10));
    }
    for i in 0..3 {
        records.push(record("mdupont", "Click", base + Duration::minutes(70 + i), 10));
    }
    for i in 3..9 {
        records.push(record("detector", "Whistle", base + Duration::seconds(i * 10), 10));
    }
    DetectionTable::new(records)
}

fn afternoon() -> ReportWindow {
    ReportWindow::new(ts("2023-02-11T12:00:00+01:00"), ts("2023-02-11T15:00:00+01:00")).unwrap()
}

struct ShortSunTimes;

impl SunTimesProvider for ShortSunTimes {
    fn sun_times(
        &self,
        first_day: NaiveDate,
        _last_day: NaiveDate,
        _offset: FixedOffset,
        _location: &GeographicLocation,
    ) -> AnalysisResult<SunTimes> {
        Ok(SunTimes {
            days: vec![first_day],
            sunrise_hours: vec![7.0],
            sunset_hours: vec![18.0],
        })
    }
}

#[test]
fn test_report_window_rejects_inverted_range() {
    let err = ReportWindow::new(ts("2023-02-12T00:00:00+01:00"), ts("2023-02-11T00:00:00+01:00"))
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_PARAMETER");
}

#[test]
fn test_seasonality_hourly() {
    let report = seasonality_report(
        &sample_table(),
        &SelectionKey::new("mdupont", "Whistle"),
        &afternoon(),
        Resolution::Minutes { bin_minutes: 60 },
        OverflowPolicy::Flag,
    )
    .unwrap();

    assert_eq!(report.selection, "mdupont/Whistle");
    assert_eq!(report.counts.max_count_per_bin, 360.0);
    assert_eq!(report.counts.counts[0], 6);
    assert_eq!(report.counts.total(), 6);
    assert_eq!(report.rates.values.len(), report.counts.counts.len());
    assert!(report.rate_label.contains("60 min"));
}

#[test]
fn test_seasonality_unknown_label() {
    let err = seasonality_report(
        &sample_table(),
        &SelectionKey::new("detector", "Click"),
        &afternoon(),
        Resolution::Days,
        OverflowPolicy::Flag,
    )
    .unwrap_err();
    assert_eq!(err.code(), "INSUFFICIENT_DATA");
}

#[test]
fn test_seasonality_rejects_bad_resolution_before_lookup() {
    let err = seasonality_report(
        &sample_table(),
        &SelectionKey::new("nobody", "Whistle"),
        &afternoon(),
        Resolution::Minutes { bin_minutes: 0 },
        OverflowPolicy::Flag,
    )
    .unwrap_err();
    assert_eq!(err.code(), "INVALID_PARAMETER");
}

#[test]
fn test_multilabel_orders_labels() {
    let report = multilabel_report(
        &sample_table(),
        "mdupont",
        &afternoon(),
        60,
        DEFAULT_MAX_LABELS,
        OverflowPolicy::Flag,
    )
    .unwrap();

    let names: Vec<&str> = report.series.iter().map(|s| s.selection.as_str()).collect();
    assert_eq!(names, vec!["mdupont/Click", "mdupont/Whistle"]);
    assert_eq!(report.series[0].counts.counts[1], 3);
}

#[test]
fn test_multilabel_truncates_to_max_labels() {
    let report = multilabel_report(
        &sample_table(),
        "mdupont",
        &afternoon(),
        60,
        1,
        OverflowPolicy::Flag,
    )
    .unwrap();
    assert_eq!(report.series.len(), 1);
}

#[test]
fn test_multilabel_single_label_annotator() {
    let err = multilabel_report(
        &sample_table(),
        "detector",
        &afternoon(),
        60,
        DEFAULT_MAX_LABELS,
        OverflowPolicy::Flag,
    )
    .unwrap_err();
    assert_eq!(err.code(), "INSUFFICIENT_DATA");
}

#[test]
fn test_comparison_agreement() {
    let report = annotator_comparison(
        &sample_table(),
        &SelectionKey::new("mdupont", "Whistle"),
        &SelectionKey::new("detector", "Whistle"),
        &afternoon(),
        10,
        OverflowPolicy::Flag,
    )
    .unwrap();

    // 3 shared timestamps out of 9 distinct ones
    assert_eq!(report.agreement.common_count, 3);
    assert_eq!(report.agreement.unique_count, 6);
    assert!((report.agreement.agreement_pct - 100.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_comparison_needs_two_annotators() {
    let table = DetectionTable::new(vec![record(
        "mdupont",
        "Whistle",
        ts("2023-02-11T12:00:00+01:00"),
        10,
    )]);
    let err = annotator_comparison(
        &table,
        &SelectionKey::new("mdupont", "Whistle"),
        &SelectionKey::new("mdupont", "Whistle"),
        &afternoon(),
        10,
        OverflowPolicy::Flag,
    )
    .unwrap_err();
    assert_eq!(err.code(), "INSUFFICIENT_DATA");
}

#[test]
fn test_comparison_timebin_mismatch() {
    let base = ts("2023-02-11T12:00:00+01:00");
    let table = DetectionTable::new(vec![
        record("mdupont", "Whistle", base, 10),
        record("detector", "Whistle", base, 60),
    ]);
    let err = annotator_comparison(
        &table,
        &SelectionKey::new("mdupont", "Whistle"),
        &SelectionKey::new("detector", "Whistle"),
        &afternoon(),
        10,
        OverflowPolicy::Flag,
    )
    .unwrap_err();
    assert_eq!(err.code(), "TIMEBIN_MISMATCH");
}

#[test]
fn test_diel_heatmap_report() {
    let window =
        ReportWindow::new(ts("2023-02-11T00:00:00+01:00"), ts("2023-02-13T00:00:00+01:00")).unwrap();
    let location = GeographicLocation::new(47.5, -3.2).unwrap();
    let provider = FixedSunTimes::new(8.0, 18.0).unwrap();

    let report = diel_heatmap_report(
        &sample_table(),
        &SelectionKey::new("mdupont", "Whistle"),
        &window,
        &location,
        &provider,
    )
    .unwrap();

    assert_eq!(report.overlay.heatmap.day_count(), 2);
    assert_eq!(report.overlay.sun_times.len(), 2);
    assert_eq!(report.overlay.heatmap.cell(12, 0), Some(6));
    assert_eq!(report.overlay.daylight_total(), 6);
}

#[test]
fn test_diel_heatmap_report_shape_mismatch() {
    let window =
        ReportWindow::new(ts("2023-02-11T00:00:00+01:00"), ts("2023-02-13T00:00:00+01:00")).unwrap();
    let location = GeographicLocation::new(47.5, -3.2).unwrap();

    let err = diel_heatmap_report(
        &sample_table(),
        &SelectionKey::new("mdupont", "Whistle"),
        &window,
        &location,
        &ShortSunTimes,
    )
    .unwrap_err();
    assert_eq!(err.code(), "INVALID_PARAMETER");
    assert_eq!(err.context().selection.as_deref(), Some("mdupont/Whistle"));
}

#[test]
fn test_diel_scatter_report() {
    let location = GeographicLocation::new(47.5, -3.2).unwrap();
    let provider = FixedSunTimes::new(8.0, 18.0).unwrap();

    let report = diel_scatter_report(
        &sample_table(),
        &SelectionKey::new("mdupont", "Click"),
        &afternoon(),
        &location,
        &provider,
    )
    .unwrap();

    assert_eq!(report.points.len(), 3);
    assert_eq!(report.points[0].hour, 13.0 + 10.0 / 60.0);
    assert_eq!(report.sun_times.len(), 1);
}
