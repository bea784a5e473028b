//! Detection histogram over a time grid and its normalization into rates.
//!
//! ## Edge cases
//! - Detections outside `[grid.begin, grid.end)` are dropped and counted in
//!   `dropped`, never an error.
//! - A bin holding more detections than its capacity means two timebins were
//!   mixed upstream. The bin is always listed in `overflow_bins`; what the rate
//!   series does with it is decided by [`OverflowPolicy`].

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::time_grid::TimeGrid;
use crate::error::{AnalysisError, AnalysisResult, ErrorContext};

/// What to do with bins whose rate exceeds 100 %.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Keep the value above 100 % and flag the series.
    #[default]
    Flag,
    /// Clamp the value to 100 % and flag the series.
    Clamp,
    /// Fail the report.
    Reject,
}

/// Per-bin detection counts of one selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub bin_starts: Vec<DateTime<FixedOffset>>,
    pub counts: Vec<u32>,
    pub max_count_per_bin: f64,
    /// Detections that fell outside the grid.
    pub dropped: usize,
    /// Indices of bins whose count exceeds `max_count_per_bin`.
    pub overflow_bins: Vec<usize>,
}

impl AggregationResult {
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }

    pub fn exceeds_capacity(&self) -> bool {
        !self.overflow_bins.is_empty()
    }
}

/// Normalized per-bin rates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateSeries {
    pub bin_starts: Vec<DateTime<FixedOffset>>,
    pub values: Vec<f64>,
    /// Value of a completely filled bin (100.0 for percentages, 1.0 for
    /// fractions).
    pub full_scale: f64,
    pub exceeds_capacity: bool,
    pub overflow_bins: Vec<usize>,
}

/// Count detections per grid bin.
///
/// Each detection is located by binary search on the boundaries, so the cost
/// is `O(n log m)` for `n` detections and `m` bins.
pub fn aggregate(detections: &[DateTime<FixedOffset>], grid: &TimeGrid) -> AggregationResult {
    let mut counts = vec![0u32; grid.bin_count()];
    let mut dropped = 0usize;

    for t in detections {
        match grid.bin_index(t) {
            Some(idx) => counts[idx] += 1,
            None => dropped += 1,
        }
    }

    let max_count_per_bin = grid.max_count_per_bin();
    let overflow_bins: Vec<usize> = counts
        .iter()
        .enumerate()
        .filter(|(_, &c)| f64::from(c) > max_count_per_bin)
        .map(|(i, _)| i)
        .collect();

    if !overflow_bins.is_empty() {
        log::warn!(
            "{} bin(s) exceed the capacity of {} detections; timebins were likely mixed upstream",
            overflow_bins.len(),
            max_count_per_bin
        );
    }
    if dropped > 0 {
        log::debug!("{} detection(s) outside the grid were dropped", dropped);
    }

    AggregationResult {
        bin_starts: grid.bin_starts().to_vec(),
        counts,
        max_count_per_bin,
        dropped,
        overflow_bins,
    }
}

/// Rates in percent of the bin capacity (`count / max × 100`).
pub fn to_percentage(
    result: &AggregationResult,
    policy: OverflowPolicy,
) -> AnalysisResult<RateSeries> {
    normalize(result, policy, 100.0)
}

/// Rates as a fraction of the bin capacity (`count / max`).
pub fn to_fraction(result: &AggregationResult, policy: OverflowPolicy) -> AnalysisResult<RateSeries> {
    normalize(result, policy, 1.0)
}

fn normalize(
    result: &AggregationResult,
    policy: OverflowPolicy,
    full_scale: f64,
) -> AnalysisResult<RateSeries> {
    if let (OverflowPolicy::Reject, Some(&first)) = (policy, result.overflow_bins.first()) {
        return Err(AnalysisError::CapacityExceeded {
            message: format!(
                "bin {} holds {} detections for a capacity of {}",
                first, result.counts[first], result.max_count_per_bin
            ),
            context: ErrorContext::new("normalize").with_details(format!(
                "{} overflowing bin(s)",
                result.overflow_bins.len()
            )),
        });
    }

    let values = result
        .counts
        .iter()
        .map(|&c| {
            let rate = f64::from(c) / result.max_count_per_bin * full_scale;
            match policy {
                OverflowPolicy::Clamp => rate.min(full_scale),
                _ => rate,
            }
        })
        .collect();

    Ok(RateSeries {
        bin_starts: result.bin_starts.clone(),
        values,
        full_scale,
        exceeds_capacity: result.exceeds_capacity(),
        overflow_bins: result.overflow_bins.clone(),
    })
}
