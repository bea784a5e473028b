//! Analysis services.
//!
//! Leaves first: grid construction, aggregation into rates, the hour × day
//! heatmap and the agreement engine. The diel overlay and the overview sit on
//! top of those, and [`reports`] orchestrates them for one report request.
//! Every service takes the detection table by shared reference and is a pure
//! function of its inputs.

pub mod aggregation;
pub mod agreement;
pub mod diel;
pub mod heatmap;
pub mod overview;
pub mod reports;
pub mod time_grid;

pub use aggregation::{
    aggregate, to_fraction, to_percentage, AggregationResult, OverflowPolicy, RateSeries,
};
pub use agreement::{
    compare, compare_with_policy, concordance, pearson_correlation, AgreementResult, Concordance,
};
pub use diel::{diel_points, DielOverlay, DielPoint, FixedSunTimes, SunTimes, SunTimesProvider};
pub use heatmap::{build_heatmap, window_days, HeatmapMatrix, HOURS_PER_DAY};
pub use overview::{summarize, DetectionOverview};
pub use reports::{
    annotator_comparison, diel_heatmap_report, diel_scatter_report, multilabel_report,
    seasonality_report, ComparisonReport, DielHeatmapReport, DielScatterReport, MultilabelReport,
    ReportWindow, SeasonalityReport, SelectionKey, DEFAULT_MAX_LABELS,
};
pub use time_grid::{build_grid, Resolution, TimeGrid};
