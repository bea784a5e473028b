//! Hour-of-day by day activity matrix.
//!
//! Columns are local calendar days in the requested offset, rows are local
//! hours 0–23. Every day of the window gets a column even when it holds no
//! detection, so column position always encodes the date.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike};
use serde::{Serialize, Serializer};

use crate::error::{AnalysisError, AnalysisResult, ErrorContext};

pub const HOURS_PER_DAY: usize = 24;

/// 24 × D matrix of detection counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapMatrix {
    /// Column labels.
    pub days: Vec<NaiveDate>,
    /// `cells[hour][day]`.
    pub cells: Vec<Vec<u32>>,
    /// Written as seconds east of UTC.
    #[serde(rename = "offset_seconds", serialize_with = "serialize_offset")]
    pub offset: FixedOffset,
}

fn serialize_offset<S>(offset: &FixedOffset, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_i32(offset.local_minus_utc())
}

impl HeatmapMatrix {
    fn zeroed(days: Vec<NaiveDate>, offset: FixedOffset) -> Self {
        let cells = vec![vec![0u32; days.len()]; HOURS_PER_DAY];
        Self {
            days,
            cells,
            offset,
        }
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn cell(&self, hour: usize, day: usize) -> Option<u32> {
        self.cells.get(hour)?.get(day).copied()
    }

    pub fn row(&self, hour: usize) -> Option<&[u32]> {
        self.cells.get(hour).map(Vec::as_slice)
    }

    pub fn total(&self) -> u64 {
        self.cells
            .iter()
            .flat_map(|row| row.iter())
            .map(|&c| u64::from(c))
            .sum()
    }

    /// Largest cell value, used to scale a colorbar.
    pub fn max_cell(&self) -> u32 {
        self.cells
            .iter()
            .flat_map(|row| row.iter().copied())
            .max()
            .unwrap_or(0)
    }

    /// Number of cells holding at least one detection.
    pub fn non_zero_cells(&self) -> usize {
        self.cells
            .iter()
            .flat_map(|row| row.iter())
            .filter(|&&c| c > 0)
            .count()
    }
}

/// Local calendar days covered by `[begin, end]` in `offset`.
///
/// The day of `end` is left out when `end` is exactly local midnight after
/// `begin`, since no instant of that day is in range.
pub fn window_days(
    begin: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    offset: FixedOffset,
) -> AnalysisResult<Vec<NaiveDate>> {
    if end < begin {
        return Err(AnalysisError::InvalidParameter {
            message: format!(
                "end {} precedes begin {}",
                end.to_rfc3339(),
                begin.to_rfc3339()
            ),
            context: ErrorContext::new("window_days"),
        });
    }

    let local_begin = begin.with_timezone(&offset);
    let local_end = end.with_timezone(&offset);
    let first_day = local_begin.date_naive();
    let mut last_day = local_end.date_naive();
    if local_end > local_begin && local_end.time() == NaiveTime::MIN {
        last_day = last_day.pred_opt().unwrap_or(last_day);
    }

    Ok(first_day
        .iter_days()
        .take_while(|d| *d <= last_day)
        .collect())
}

/// Count detections per (local hour, local day) over `[begin, end)`.
pub fn build_heatmap(
    detections: &[DateTime<FixedOffset>],
    begin: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    offset: FixedOffset,
) -> AnalysisResult<HeatmapMatrix> {
    let days = window_days(begin, end, offset)?;
    let first_day = days[0];
    let mut matrix = HeatmapMatrix::zeroed(days, offset);

    for t in detections.iter().filter(|t| **t >= begin && **t < end) {
        let local = t.with_timezone(&offset);
        let day_idx = (local.date_naive() - first_day).num_days() as usize;
        let hour = local.hour() as usize;
        if let Some(cell) = matrix.cells[hour].get_mut(day_idx) {
            *cell += 1;
        }
    }

    log::debug!(
        "Heatmap built: {} days, {} detections",
        matrix.day_count(),
        matrix.total()
    );

    Ok(matrix)
}
