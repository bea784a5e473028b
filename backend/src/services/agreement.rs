//! Inter-annotator agreement between two (annotator, label) selections.
//!
//! Two measures are reported:
//! - **Concordance**: detections are compared as sets of start instants. A
//!   detection counts as common only when both selections hold the exact same
//!   instant (offsets are irrelevant, instants are compared).
//! - **Correlation**: both selections are binned on the same grid, normalized
//!   to `[0, 1]` by the bin capacity, and the Pearson coefficient is computed
//!   over all bins, empty ones included.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use super::aggregation::{aggregate, to_fraction, OverflowPolicy, RateSeries};
use super::time_grid::TimeGrid;
use crate::error::{AnalysisError, AnalysisResult, ErrorContext};
use crate::models::Selection;

/// Set-based concordance of two detection streams.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Concordance {
    pub common_count: usize,
    pub unique_count: usize,
    pub agreement_pct: f64,
    /// Both streams were empty; agreement is 100 % by definition.
    pub degenerate: bool,
}

/// Full comparison of two selections over a shared grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgreementResult {
    pub selection_a: String,
    pub selection_b: String,
    pub common_count: usize,
    pub unique_count: usize,
    pub agreement_pct: f64,
    pub degenerate: bool,
    /// Pearson `r`; `None` when either rate series has zero variance.
    pub correlation: Option<f64>,
    pub r_squared: Option<f64>,
    pub rates_a: RateSeries,
    pub rates_b: RateSeries,
}

impl AgreementResult {
    pub fn correlation_defined(&self) -> bool {
        self.correlation.is_some()
    }
}

/// Concordance of two sets of detection start instants.
pub fn concordance(a: &[DateTime<FixedOffset>], b: &[DateTime<FixedOffset>]) -> Concordance {
    let set_a: BTreeSet<DateTime<Utc>> = a.iter().map(|t| t.with_timezone(&Utc)).collect();
    let set_b: BTreeSet<DateTime<Utc>> = b.iter().map(|t| t.with_timezone(&Utc)).collect();

    if set_a.is_empty() && set_b.is_empty() {
        log::warn!("Both detection sets are empty; agreement reported as 100%");
        return Concordance {
            common_count: 0,
            unique_count: 0,
            agreement_pct: 100.0,
            degenerate: true,
        };
    }

    let common_count = set_a.intersection(&set_b).count();
    let unique_count = set_a.symmetric_difference(&set_b).count();
    let agreement_pct = 100.0 * common_count as f64 / (common_count + unique_count) as f64;

    Concordance {
        common_count,
        unique_count,
        agreement_pct,
        degenerate: false,
    }
}

/// Pearson correlation coefficient of two paired series.
///
/// Returns `None` for mismatched lengths, fewer than two points, or a series
/// with zero variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut sum_sq_x = 0.0;
    let mut sum_sq_y = 0.0;

    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        numerator += dx * dy;
        sum_sq_x += dx * dx;
        sum_sq_y += dy * dy;
    }

    if sum_sq_x == 0.0 || sum_sq_y == 0.0 {
        return None;
    }

    Some((numerator / (sum_sq_x * sum_sq_y).sqrt()).clamp(-1.0, 1.0))
}

fn check_timebins(a: &Selection, b: &Selection, grid: &TimeGrid) -> AnalysisResult<()> {
    if a.timebin != b.timebin {
        return Err(AnalysisError::TimebinMismatch {
            message: format!(
                "the timebin of {} is {} whereas the timebin of {} is {}",
                a.name(),
                a.timebin,
                b.name(),
                b.timebin
            ),
            context: ErrorContext::new("compare"),
        });
    }
    if grid.timebin() != a.timebin {
        return Err(AnalysisError::TimebinMismatch {
            message: format!(
                "grid was built for a {} timebin but the selections use {}",
                grid.timebin(),
                a.timebin
            ),
            context: ErrorContext::new("compare"),
        });
    }
    Ok(())
}

/// Compare two selections over `grid`, flagging (not clamping) overfull
/// bins.
pub fn compare(a: &Selection, b: &Selection, grid: &TimeGrid) -> AnalysisResult<AgreementResult> {
    compare_with_policy(a, b, grid, OverflowPolicy::Flag)
}

/// Compare two selections over `grid`.
///
/// # Errors
/// `TimebinMismatch` if the selections (or the grid) do not share one
/// timebin; nothing is computed in that case. `CapacityExceeded` only under
/// [`OverflowPolicy::Reject`].
pub fn compare_with_policy(
    a: &Selection,
    b: &Selection,
    grid: &TimeGrid,
    policy: OverflowPolicy,
) -> AnalysisResult<AgreementResult> {
    check_timebins(a, b, grid)?;

    let conc = concordance(&a.start_times, &b.start_times);

    let rates_a = to_fraction(&aggregate(&a.start_times, grid), policy)
        .map_err(|e| e.with_selection(&a.annotator, &a.label))?;
    let rates_b = to_fraction(&aggregate(&b.start_times, grid), policy)
        .map_err(|e| e.with_selection(&b.annotator, &b.label))?;

    let correlation = pearson_correlation(&rates_a.values, &rates_b.values);
    if correlation.is_none() {
        log::warn!(
            "Correlation between {} and {} is undefined (constant rate series)",
            a.name(),
            b.name()
        );
    }

    log::debug!(
        "Agreement {} vs {}: {:.1}% ({} common, {} unique)",
        a.name(),
        b.name(),
        conc.agreement_pct,
        conc.common_count,
        conc.unique_count
    );

    Ok(AgreementResult {
        selection_a: a.name(),
        selection_b: b.name(),
        common_count: conc.common_count,
        unique_count: conc.unique_count,
        agreement_pct: conc.agreement_pct,
        degenerate: conc.degenerate,
        correlation,
        r_squared: correlation.map(|r| r * r),
        rates_a,
        rates_b,
    })
}

#[cfg(test)]
#[path = "agreement_tests.rs"]
mod agreement_tests;
