//! Report-level orchestration.
//!
//! Each report checks its preconditions against the [`DetectionTable`] first
//! (annotators, labels, timebins, location) and only then runs the grid,
//! aggregation, heatmap or agreement code. Reports never render anything;
//! they return serializable results.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::aggregation::{
    aggregate, to_percentage, AggregationResult, OverflowPolicy, RateSeries,
};
use super::agreement::{compare_with_policy, AgreementResult};
use super::diel::{diel_points, DielOverlay, DielPoint, SunTimes, SunTimesProvider};
use super::heatmap::{build_heatmap, window_days};
use super::time_grid::{build_grid, Resolution};
use crate::error::{AnalysisError, AnalysisResult, ErrorContext};
use crate::models::{DetectionTable, GeographicLocation};

pub const DEFAULT_MAX_LABELS: usize = 3;

/// Analysis window shared by every report of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportWindow {
    pub begin: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl ReportWindow {
    pub fn new(begin: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> AnalysisResult<Self> {
        if end < begin {
            return Err(AnalysisError::InvalidParameter {
                message: format!(
                    "end {} precedes begin {}",
                    end.to_rfc3339(),
                    begin.to_rfc3339()
                ),
                context: ErrorContext::new("report_window"),
            });
        }
        Ok(Self { begin, end })
    }

    /// Offset used for local days and hours.
    pub fn offset(&self) -> FixedOffset {
        *self.begin.offset()
    }
}

/// An (annotator, label) pair as named in a report request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionKey {
    pub annotator: String,
    pub label: String,
}

impl SelectionKey {
    pub fn new(annotator: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            annotator: annotator.into(),
            label: label.into(),
        }
    }
}

/// Activity of one selection over time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalityReport {
    pub selection: String,
    pub resolution: Resolution,
    pub count_label: String,
    pub rate_label: String,
    pub counts: AggregationResult,
    pub rates: RateSeries,
}

/// Activity of several labels of one annotator on the same resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultilabelReport {
    pub annotator: String,
    pub series: Vec<SeasonalityReport>,
}

/// Agreement between two selections of two different annotators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub resolution: Resolution,
    pub rate_label: String,
    pub agreement: AgreementResult,
}

/// Detections on the date × hour plane with the day/night boundaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DielScatterReport {
    pub selection: String,
    pub location: GeographicLocation,
    pub points: Vec<DielPoint>,
    pub sun_times: SunTimes,
}

/// Hour × day heatmap of one selection with the day/night boundaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DielHeatmapReport {
    pub selection: String,
    pub location: GeographicLocation,
    pub overlay: DielOverlay,
}

/// Detection counts and rates of one annotator/label over the window.
///
/// # Errors
/// `InsufficientData` for an unknown pair, `TimebinMismatch` if the pair mixes
/// timebins, `InvalidParameter` for a bad resolution, and `CapacityExceeded`
/// under [`OverflowPolicy::Reject`].
pub fn seasonality_report(
    table: &DetectionTable,
    key: &SelectionKey,
    window: &ReportWindow,
    resolution: Resolution,
    policy: OverflowPolicy,
) -> AnalysisResult<SeasonalityReport> {
    resolution.validate()?;
    let selection = table.selection(&key.annotator, &key.label)?;

    let grid = build_grid(window.begin, window.end, resolution, selection.timebin)
        .map_err(|e| e.with_selection(&key.annotator, &key.label))?;
    let counts = aggregate(&selection.start_times, &grid);
    let rates = to_percentage(&counts, policy)
        .map_err(|e| e.with_selection(&key.annotator, &key.label))?;

    log::info!(
        "Seasonality {} ({}): {} detections over {} bins",
        selection.name(),
        resolution,
        counts.total(),
        grid.bin_count()
    );

    Ok(SeasonalityReport {
        selection: selection.name(),
        resolution,
        count_label: resolution.count_label(),
        rate_label: resolution.rate_label(),
        counts,
        rates,
    })
}

/// Seasonality of the first `max_labels` labels (alphabetical) of
/// `annotator`, on a fixed-minute grid.
///
/// # Errors
/// `InsufficientData` if the annotator is unknown or used a single label.
pub fn multilabel_report(
    table: &DetectionTable,
    annotator: &str,
    window: &ReportWindow,
    bin_minutes: u32,
    max_labels: usize,
    policy: OverflowPolicy,
) -> AnalysisResult<MultilabelReport> {
    let resolution = Resolution::minutes(bin_minutes)?;
    if max_labels == 0 {
        return Err(AnalysisError::InvalidParameter {
            message: "at least one label must be requested".to_string(),
            context: ErrorContext::new("multilabel_report"),
        });
    }

    let meta = table.metadata(annotator).ok_or_else(|| AnalysisError::InsufficientData {
        message: format!("annotator '{}' has no detections", annotator),
        context: ErrorContext::new("multilabel_report"),
    })?;
    if meta.labels.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            message: format!(
                "annotator '{}' used {} label(s), a multilabel report needs at least 2",
                annotator,
                meta.labels.len()
            ),
            context: ErrorContext::new("multilabel_report"),
        });
    }
    if meta.labels.len() > max_labels {
        log::warn!(
            "Annotator '{}' has {} labels, only the first {} are reported",
            annotator,
            meta.labels.len(),
            max_labels
        );
    }

    let series = meta
        .labels
        .iter()
        .take(max_labels)
        .map(|label| {
            seasonality_report(
                table,
                &SelectionKey::new(annotator, label.as_str()),
                window,
                resolution,
                policy,
            )
        })
        .collect::<AnalysisResult<Vec<_>>>()
        .map_err(|e| e.with_operation("multilabel_report"))?;

    Ok(MultilabelReport {
        annotator: annotator.to_string(),
        series,
    })
}

/// Agreement between `a` and `b` on a fixed-minute grid.
///
/// # Errors
/// `InsufficientData` if the table holds fewer than two annotators or either
/// pair is unknown; `TimebinMismatch` if the two selections differ in
/// timebin. Nothing is aggregated when validation fails.
pub fn annotator_comparison(
    table: &DetectionTable,
    a: &SelectionKey,
    b: &SelectionKey,
    window: &ReportWindow,
    bin_minutes: u32,
    policy: OverflowPolicy,
) -> AnalysisResult<ComparisonReport> {
    let resolution = Resolution::minutes(bin_minutes)?;

    let annotators = table.annotators();
    if annotators.len() < 2 {
        return Err(AnalysisError::InsufficientData {
            message: format!(
                "comparison needs at least 2 annotators, found {}",
                annotators.len()
            ),
            context: ErrorContext::new("annotator_comparison"),
        });
    }

    let selection_a = table.selection(&a.annotator, &a.label)?;
    let selection_b = table.selection(&b.annotator, &b.label)?;
    if selection_a.timebin != selection_b.timebin {
        return Err(AnalysisError::TimebinMismatch {
            message: format!(
                "the timebin of {} is {} whereas the timebin of {} is {}",
                selection_a.name(),
                selection_a.timebin,
                selection_b.name(),
                selection_b.timebin
            ),
            context: ErrorContext::new("annotator_comparison"),
        });
    }

    let grid = build_grid(window.begin, window.end, resolution, selection_a.timebin)?;
    let agreement = compare_with_policy(&selection_a, &selection_b, &grid, policy)?;

    log::info!(
        "Comparison {} vs {}: {:.1}% agreement, r = {}",
        agreement.selection_a,
        agreement.selection_b,
        agreement.agreement_pct,
        agreement
            .correlation
            .map(|r| format!("{:.3}", r))
            .unwrap_or_else(|| "undefined".to_string())
    );

    Ok(ComparisonReport {
        resolution,
        rate_label: resolution.rate_label(),
        agreement,
    })
}

/// Date and decimal hour of each detection of one selection, with the sun
/// times of every day in the window.
pub fn diel_scatter_report(
    table: &DetectionTable,
    key: &SelectionKey,
    window: &ReportWindow,
    location: &GeographicLocation,
    provider: &dyn SunTimesProvider,
) -> AnalysisResult<DielScatterReport> {
    let selection = table.selection(&key.annotator, &key.label)?;
    let offset = window.offset();

    let points = diel_points(&selection.start_times, window.begin, window.end, offset)?;
    let days = window_days(window.begin, window.end, offset)?;
    let sun_times = match (days.first(), days.last()) {
        (Some(first), Some(last)) => provider.sun_times(*first, *last, offset, location)?,
        _ => SunTimes {
            days,
            sunrise_hours: Vec::new(),
            sunset_hours: Vec::new(),
        },
    };

    Ok(DielScatterReport {
        selection: selection.name(),
        location: *location,
        points,
        sun_times,
    })
}

/// Hour × day heatmap of one selection overlaid with the sun times.
///
/// # Errors
/// `InvalidParameter` if the provider does not return exactly one sunrise and
/// one sunset per heatmap column.
pub fn diel_heatmap_report(
    table: &DetectionTable,
    key: &SelectionKey,
    window: &ReportWindow,
    location: &GeographicLocation,
    provider: &dyn SunTimesProvider,
) -> AnalysisResult<DielHeatmapReport> {
    let selection = table.selection(&key.annotator, &key.label)?;
    let offset = window.offset();

    let heatmap = build_heatmap(&selection.start_times, window.begin, window.end, offset)?;
    let (first_day, last_day) = match (heatmap.days.first(), heatmap.days.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(AnalysisError::InsufficientData {
                message: "heatmap window covers no day".to_string(),
                context: ErrorContext::new("diel_heatmap_report"),
            })
        }
    };
    let sun_times = provider.sun_times(first_day, last_day, offset, location)?;
    let overlay = DielOverlay::compose(heatmap, sun_times)
        .map_err(|e| e.with_selection(&key.annotator, &key.label))?;

    log::info!(
        "Diel heatmap {}: {} days, {} detections",
        selection.name(),
        overlay.heatmap.day_count(),
        overlay.heatmap.total()
    );

    Ok(DielHeatmapReport {
        selection: selection.name(),
        location: *location,
        overlay,
    })
}

#[cfg(test)]
#[path = "reports_tests.rs"]
mod reports_tests;
