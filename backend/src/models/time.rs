use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AnalysisError, AnalysisResult};

/// Rounding granularity applied to fixed-minute grid edges (10 minutes).
pub const GRID_ROUNDING_SECONDS: i64 = 600;

/// Minimum temporal resolution at which an annotator/label stream reports
/// detections, in seconds.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timebin(u32);

impl Timebin {
    pub fn new(seconds: u32) -> Self {
        Timebin(seconds)
    }

    /// Build a timebin, rejecting a zero duration.
    pub fn try_new(seconds: u32) -> AnalysisResult<Self> {
        if seconds == 0 {
            return Err(AnalysisError::invalid_parameter(
                "timebin duration must be a positive number of seconds",
            ));
        }
        Ok(Timebin(seconds))
    }

    pub fn seconds(&self) -> u32 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::seconds(i64::from(self.0))
    }
}

impl fmt::Display for Timebin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Seconds elapsed since the local (wall-clock) epoch, including the
/// sub-second part as nanoseconds.
fn local_epoch_parts(dt: &DateTime<FixedOffset>) -> (i64, u32) {
    let local = dt.naive_local();
    (local.and_utc().timestamp(), local.nanosecond())
}

/// Round an instant down to a multiple of `granularity_seconds`, aligned on
/// the instant's own wall clock (a 600s grid in UTC+01:00 starts at local
/// :00, :10, ...).
pub fn floor_to(dt: DateTime<FixedOffset>, granularity_seconds: i64) -> DateTime<FixedOffset> {
    let (secs, nanos) = local_epoch_parts(&dt);
    let rem = secs.rem_euclid(granularity_seconds);
    dt - Duration::seconds(rem) - Duration::nanoseconds(i64::from(nanos))
}

/// Round an instant up to a multiple of `granularity_seconds` (wall-clock
/// aligned). Instants already on a boundary are returned unchanged.
pub fn ceil_to(dt: DateTime<FixedOffset>, granularity_seconds: i64) -> DateTime<FixedOffset> {
    let floored = floor_to(dt, granularity_seconds);
    if floored == dt {
        dt
    } else {
        floored + Duration::seconds(granularity_seconds)
    }
}

/// Attach a fixed offset to a local wall-clock time.
pub fn at_local(naive: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let utc = naive - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

/// Local midnight of `date` in `offset`.
pub fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    at_local(date.and_time(chrono::NaiveTime::MIN), offset)
}

/// Decimal hour of the local wall clock (`13:30` -> `13.5`).
pub fn decimal_hour(dt: &DateTime<FixedOffset>) -> f64 {
    f64::from(dt.hour()) + f64::from(dt.minute()) / 60.0
}
