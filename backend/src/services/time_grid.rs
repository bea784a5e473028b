//! Time grid construction.
//!
//! A grid is the ordered list of bin boundaries every aggregation shares.
//! Fixed-minute grids are evenly spaced in seconds and snapped to a 10-minute
//! wall-clock granularity; daily, weekly and monthly grids follow the
//! calendar of the grid's offset (midnight, Monday, 1st of the month).
//!
//! ## Bin capacity
//! `max_count_per_bin` is the number of timebins that fit in one bin, i.e. the
//! count a selection reaches when it fires on every timebin. Calendar
//! resolutions use a fixed nominal length (a month is always 31 days, a week
//! always 7) so short months are under-filled compared to long ones.

use chrono::{DateTime, Datelike, Days, Duration, FixedOffset, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AnalysisError, AnalysisResult, ErrorContext};
use crate::models::time::{ceil_to, floor_to, local_midnight, Timebin, GRID_ROUNDING_SECONDS};

pub const MIN_BIN_MINUTES: u32 = 1;
pub const MAX_BIN_MINUTES: u32 = 86_400;

pub const SECONDS_PER_DAY: i64 = 86_400;
pub const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;
/// Nominal month length used for capacity, whatever the calendar month.
pub const SECONDS_PER_NOMINAL_MONTH: i64 = 31 * SECONDS_PER_DAY;

/// Bin resolution of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Resolution {
    /// Evenly spaced bins of `bin_minutes` minutes.
    Minutes { bin_minutes: u32 },
    /// One bin per calendar day.
    Days,
    /// One bin per week, starting on Mondays.
    Weeks,
    /// One bin per calendar month, starting on the 1st.
    Months,
}

impl Resolution {
    /// Fixed-minute resolution, validated against `[1, 86400]` minutes.
    pub fn minutes(bin_minutes: u32) -> AnalysisResult<Self> {
        let resolution = Resolution::Minutes { bin_minutes };
        resolution.validate()?;
        Ok(resolution)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        if let Resolution::Minutes { bin_minutes } = *self {
            if !(MIN_BIN_MINUTES..=MAX_BIN_MINUTES).contains(&bin_minutes) {
                return Err(AnalysisError::InvalidParameter {
                    message: format!(
                        "bin size must be within [{}, {}] minutes, got {}",
                        MIN_BIN_MINUTES, MAX_BIN_MINUTES, bin_minutes
                    ),
                    context: ErrorContext::new("build_grid"),
                });
            }
        }
        Ok(())
    }

    /// Bin length used for capacity normalization.
    pub fn nominal_bin_seconds(&self) -> i64 {
        match *self {
            Resolution::Minutes { bin_minutes } => i64::from(bin_minutes) * 60,
            Resolution::Days => SECONDS_PER_DAY,
            Resolution::Weeks => SECONDS_PER_WEEK,
            Resolution::Months => SECONDS_PER_NOMINAL_MONTH,
        }
    }

    pub fn is_calendar(&self) -> bool {
        !matches!(self, Resolution::Minutes { .. })
    }

    /// Axis title for raw counts.
    pub fn count_label(&self) -> String {
        match *self {
            Resolution::Minutes { bin_minutes } => {
                format!("Number of detections\n({} min)", bin_minutes)
            }
            Resolution::Days => "Number of detections per day".to_string(),
            Resolution::Weeks => {
                "Number of detections per week (starting every Monday)".to_string()
            }
            Resolution::Months => "Number of detections per month".to_string(),
        }
    }

    /// Axis title for percentage rates.
    pub fn rate_label(&self) -> String {
        match *self {
            Resolution::Minutes { bin_minutes } => {
                format!("Detection rate %\n({} min)", bin_minutes)
            }
            Resolution::Days => "Detection rate % per day".to_string(),
            Resolution::Weeks => "Detection rate % per week".to_string(),
            Resolution::Months => "Detection rate % per month".to_string(),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Minutes { bin_minutes } => write!(f, "{} min", bin_minutes),
            Resolution::Days => write!(f, "daily"),
            Resolution::Weeks => write!(f, "weekly"),
            Resolution::Months => write!(f, "monthly"),
        }
    }
}

/// Contiguous bin boundaries plus the capacity of each bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeGrid {
    boundaries: Vec<DateTime<FixedOffset>>,
    resolution: Resolution,
    timebin: Timebin,
    max_count_per_bin: f64,
}

impl TimeGrid {
    pub fn boundaries(&self) -> &[DateTime<FixedOffset>] {
        &self.boundaries
    }

    /// First boundary (inclusive lower edge of the first bin).
    pub fn begin(&self) -> DateTime<FixedOffset> {
        self.boundaries[0]
    }

    /// Last boundary (exclusive upper edge of the last bin).
    pub fn end(&self) -> DateTime<FixedOffset> {
        self.boundaries[self.boundaries.len() - 1]
    }

    pub fn bin_count(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Lower edge of every bin.
    pub fn bin_starts(&self) -> &[DateTime<FixedOffset>] {
        &self.boundaries[..self.bin_count()]
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn timebin(&self) -> Timebin {
        self.timebin
    }

    pub fn max_count_per_bin(&self) -> f64 {
        self.max_count_per_bin
    }

    pub fn offset(&self) -> FixedOffset {
        *self.boundaries[0].offset()
    }

    /// Local calendar dates of the boundaries.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.boundaries.iter().map(|b| b.date_naive()).collect()
    }

    /// Index of the half-open bin `[b[i], b[i+1])` containing `t`.
    pub fn bin_index(&self, t: &DateTime<FixedOffset>) -> Option<usize> {
        if *t < self.begin() || *t >= self.end() {
            return None;
        }
        // Number of boundaries <= t, minus one, is the containing bin.
        let upper = self.boundaries.partition_point(|b| b <= t);
        Some(upper - 1)
    }

    /// Whether `t` falls inside `[begin, end)`.
    pub fn contains(&self, t: &DateTime<FixedOffset>) -> bool {
        self.bin_index(t).is_some()
    }
}

/// Build the grid covering `[begin, end]` at `resolution` for detections
/// emitted every `timebin`.
///
/// All boundaries carry `begin`'s offset.
///
/// # Errors
/// `InvalidParameter` when the bin size is outside `[1, 86400]` minutes, the
/// timebin is zero, `end` precedes `begin`, or a bin would be shorter than
/// the timebin.
pub fn build_grid(
    begin: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    resolution: Resolution,
    timebin: Timebin,
) -> AnalysisResult<TimeGrid> {
    resolution.validate()?;
    Timebin::try_new(timebin.seconds()).map_err(|e| e.with_operation("build_grid"))?;

    if end < begin {
        return Err(AnalysisError::InvalidParameter {
            message: format!(
                "end {} precedes begin {}",
                end.to_rfc3339(),
                begin.to_rfc3339()
            ),
            context: ErrorContext::new("build_grid"),
        });
    }

    let max_count_per_bin =
        resolution.nominal_bin_seconds() as f64 / f64::from(timebin.seconds());
    if max_count_per_bin < 1.0 {
        return Err(AnalysisError::InvalidParameter {
            message: format!(
                "resolution {} is finer than the detection timebin {}",
                resolution, timebin
            ),
            context: ErrorContext::new("build_grid"),
        });
    }

    let offset = *begin.offset();
    let end = end.with_timezone(&offset);

    let boundaries = match resolution {
        Resolution::Minutes { bin_minutes } => {
            fixed_minute_boundaries(begin, end, i64::from(bin_minutes) * 60, timebin)
        }
        _ => calendar_boundaries(begin, end, resolution, offset)?,
    };

    log::debug!(
        "Built {} {} grid: {} bins from {} to {} (max {} detections per bin)",
        if resolution.is_calendar() { "calendar" } else { "fixed" },
        resolution,
        boundaries.len() - 1,
        boundaries[0].to_rfc3339(),
        boundaries[boundaries.len() - 1].to_rfc3339(),
        max_count_per_bin
    );

    Ok(TimeGrid {
        boundaries,
        resolution,
        timebin,
        max_count_per_bin,
    })
}

fn fixed_minute_boundaries(
    begin: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    bin_seconds: i64,
    timebin: Timebin,
) -> Vec<DateTime<FixedOffset>> {
    let start = floor_to(begin, GRID_ROUNDING_SECONDS);
    let stop = ceil_to(end + timebin.as_duration(), GRID_ROUNDING_SECONDS);

    // stop > start because the timebin is positive; the last bin may overrun
    // `stop` so that the grid always covers it.
    let span = (stop - start).num_seconds();
    let n_bins = (span + bin_seconds - 1) / bin_seconds;

    (0..=n_bins)
        .map(|i| start + Duration::seconds(i * bin_seconds))
        .collect()
}

fn period_start(date: NaiveDate, resolution: Resolution) -> NaiveDate {
    match resolution {
        Resolution::Weeks => {
            date - Days::new(u64::from(date.weekday().num_days_from_monday()))
        }
        Resolution::Months => date.with_day(1).unwrap_or(date),
        _ => date,
    }
}

fn next_period(date: NaiveDate, resolution: Resolution) -> AnalysisResult<NaiveDate> {
    let next = match resolution {
        Resolution::Weeks => date.checked_add_days(Days::new(7)),
        Resolution::Months => date.checked_add_months(Months::new(1)),
        _ => date.checked_add_days(Days::new(1)),
    };
    next.ok_or_else(|| {
        AnalysisError::invalid_parameter(format!("date {} is out of the supported range", date))
            .with_operation("build_grid")
    })
}

fn calendar_boundaries(
    begin: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    resolution: Resolution,
    offset: FixedOffset,
) -> AnalysisResult<Vec<DateTime<FixedOffset>>> {
    let mut date = period_start(begin.date_naive(), resolution);
    let mut boundaries = vec![local_midnight(date, offset)];

    while boundaries[boundaries.len() - 1] < end || boundaries.len() < 2 {
        date = next_period(date, resolution)?;
        boundaries.push(local_midnight(date, offset));
    }

    Ok(boundaries)
}
