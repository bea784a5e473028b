//! Diel (day/night) context for detection activity.
//!
//! Sunrise and sunset computation is not done here: it is supplied by a
//! [`SunTimesProvider`] and composed with the heatmap day axis. Hours are
//! decimal local hours in the heatmap's offset.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use super::heatmap::{window_days, HeatmapMatrix};
use crate::error::{AnalysisError, AnalysisResult, ErrorContext};
use crate::models::{decimal_hour, GeographicLocation};

/// One detection placed on the date × hour plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DielPoint {
    pub date: NaiveDate,
    /// Local `hour + minute / 60`.
    pub hour: f64,
}

/// Sunrise and sunset decimal hours, one value per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    pub days: Vec<NaiveDate>,
    pub sunrise_hours: Vec<f64>,
    pub sunset_hours: Vec<f64>,
}

impl SunTimes {
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    fn check_shape(&self) -> AnalysisResult<()> {
        if self.sunrise_hours.len() != self.days.len()
            || self.sunset_hours.len() != self.days.len()
        {
            return Err(AnalysisError::InvalidParameter {
                message: format!(
                    "sun times hold {} sunrise and {} sunset values for {} days",
                    self.sunrise_hours.len(),
                    self.sunset_hours.len(),
                    self.days.len()
                ),
                context: ErrorContext::new("sun_times"),
            });
        }
        Ok(())
    }
}

/// Source of per-day sunrise/sunset hours at a location.
pub trait SunTimesProvider {
    /// Sun times for every day in `[first_day, last_day]`, expressed in
    /// `offset` local time.
    fn sun_times(
        &self,
        first_day: NaiveDate,
        last_day: NaiveDate,
        offset: FixedOffset,
        location: &GeographicLocation,
    ) -> AnalysisResult<SunTimes>;
}

/// Provider returning the same sunrise and sunset hours every day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedSunTimes {
    pub sunrise_hour: f64,
    pub sunset_hour: f64,
}

impl FixedSunTimes {
    pub fn new(sunrise_hour: f64, sunset_hour: f64) -> AnalysisResult<Self> {
        for (name, value) in [("sunrise", sunrise_hour), ("sunset", sunset_hour)] {
            if !(0.0..24.0).contains(&value) {
                return Err(AnalysisError::invalid_parameter(format!(
                    "{} hour {} is outside [0, 24)",
                    name, value
                )));
            }
        }
        Ok(Self {
            sunrise_hour,
            sunset_hour,
        })
    }
}

impl SunTimesProvider for FixedSunTimes {
    fn sun_times(
        &self,
        first_day: NaiveDate,
        last_day: NaiveDate,
        _offset: FixedOffset,
        _location: &GeographicLocation,
    ) -> AnalysisResult<SunTimes> {
        if last_day < first_day {
            return Err(AnalysisError::InvalidParameter {
                message: format!("last day {} precedes first day {}", last_day, first_day),
                context: ErrorContext::new("sun_times"),
            });
        }

        let days: Vec<NaiveDate> = first_day
            .iter_days()
            .take_while(|d| *d <= last_day)
            .collect();
        Ok(SunTimes {
            sunrise_hours: vec![self.sunrise_hour; days.len()],
            sunset_hours: vec![self.sunset_hour; days.len()],
            days,
        })
    }
}

/// Heatmap with the sunrise/sunset curves aligned on its day axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DielOverlay {
    pub heatmap: HeatmapMatrix,
    pub sun_times: SunTimes,
}

impl DielOverlay {
    /// Pair a heatmap with sun times covering exactly its columns.
    pub fn compose(heatmap: HeatmapMatrix, sun_times: SunTimes) -> AnalysisResult<Self> {
        sun_times.check_shape()?;

        if sun_times.days != heatmap.days {
            return Err(AnalysisError::InvalidParameter {
                message: format!(
                    "sun times cover {} days but the heatmap has {} columns",
                    sun_times.len(),
                    heatmap.day_count()
                ),
                context: ErrorContext::new("diel_overlay").with_details(format!(
                    "heatmap days {:?}..{:?}",
                    heatmap.days.first(),
                    heatmap.days.last()
                )),
            });
        }

        Ok(Self { heatmap, sun_times })
    }

    /// Detections recorded between sunrise and sunset, per hour row.
    ///
    /// A cell counts as daytime when its hour interval starts at or after
    /// sunrise and ends at or before sunset. Sun-time days without a heatmap
    /// column contribute nothing.
    pub fn daylight_total(&self) -> u64 {
        let mut total = 0u64;
        for (day, (&rise, &set)) in self
            .sun_times
            .sunrise_hours
            .iter()
            .zip(&self.sun_times.sunset_hours)
            .enumerate()
        {
            for (hour, row) in self.heatmap.cells.iter().enumerate() {
                let h = hour as f64;
                if h >= rise && h + 1.0 <= set {
                    total += u64::from(row.get(day).copied().unwrap_or(0));
                }
            }
        }
        total
    }
}

/// Date and decimal hour of every detection within `[begin, end)`.
pub fn diel_points(
    detections: &[DateTime<FixedOffset>],
    begin: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    offset: FixedOffset,
) -> AnalysisResult<Vec<DielPoint>> {
    // Validates the range the same way the heatmap does.
    window_days(begin, end, offset)?;

    let points: Vec<DielPoint> = detections
        .iter()
        .filter(|t| **t >= begin && **t < end)
        .map(|t| {
            let local = t.with_timezone(&offset);
            DielPoint {
                date: local.date_naive(),
                hour: decimal_hour(&local),
            }
        })
        .collect();

    log::debug!("{} diel points in window", points.len());
    Ok(points)
}
