//! Public API surface of the analysis crate.
//!
//! This file consolidates the result types a caller receives. All of them
//! derive `Serialize` so a run can be written out as JSON.

pub use crate::error::{AnalysisError, AnalysisResult, ErrorContext};
pub use crate::models::DetectionRecord;
pub use crate::models::DetectionTable;
pub use crate::models::GeographicLocation;
pub use crate::models::Selection;
pub use crate::models::Timebin;
pub use crate::services::aggregation::AggregationResult;
pub use crate::services::aggregation::OverflowPolicy;
pub use crate::services::aggregation::RateSeries;
pub use crate::services::agreement::AgreementResult;
pub use crate::services::diel::DielOverlay;
pub use crate::services::diel::DielPoint;
pub use crate::services::diel::SunTimes;
pub use crate::services::heatmap::HeatmapMatrix;
pub use crate::services::overview::DetectionOverview;
pub use crate::services::reports::ComparisonReport;
pub use crate::services::reports::DielHeatmapReport;
pub use crate::services::reports::DielScatterReport;
pub use crate::services::reports::MultilabelReport;
pub use crate::services::reports::SeasonalityReport;
pub use crate::services::time_grid::Resolution;
pub use crate::services::time_grid::TimeGrid;

use serde::Serialize;

/// Everything produced by one configured run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportBundle {
    pub overview: DetectionOverview,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub seasonality: Vec<SeasonalityReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multilabel: Option<MultilabelReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diel_scatter: Option<DielScatterReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diel_heatmap: Option<DielHeatmapReport>,
    /// Reports that could not be produced from this table.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ReportFailure>,
}

impl ReportBundle {
    /// True when every configured report was produced.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A configured report that failed on the data, kept alongside the others.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportFailure {
    /// Config section the report came from (`seasonality`, `comparison`, ...).
    pub section: String,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
}

impl ReportFailure {
    pub fn new(section: impl Into<String>, err: &AnalysisError) -> Self {
        Self {
            section: section.into(),
            code: err.code().to_string(),
            message: err.to_string(),
            selection: err.context().selection.clone(),
        }
    }
}

/// Parse a JSON detection snapshot (an array of records).
pub fn parse_detections_json_str(json: &str) -> AnalysisResult<DetectionTable> {
    let records: Vec<DetectionRecord> = serde_json::from_str(json).map_err(|e| {
        AnalysisError::InvalidParameter {
            message: format!("Failed to parse detection snapshot: {}", e),
            context: ErrorContext::new("parse_detections"),
        }
    })?;
    Ok(DetectionTable::new(records))
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod api_tests;
