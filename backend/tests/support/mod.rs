#![allow(dead_code)]

use chrono::{DateTime, Duration, FixedOffset};

use osmose_rust::models::{DetectionRecord, DetectionTable, Selection, Timebin};

pub fn ts(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).expect("valid RFC 3339 timestamp")
}

pub fn offset_hours(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours * 3600).expect("valid offset")
}

/// One record lasting one timebin.
pub fn record(
    annotator: &str,
    label: &str,
    start: DateTime<FixedOffset>,
    timebin_s: u32,
) -> DetectionRecord {
    DetectionRecord {
        dataset: "C2D1_070722".to_string(),
        annotator: annotator.to_string(),
        label: label.to_string(),
        start_time: start,
        end_time: start + Duration::seconds(i64::from(timebin_s)),
        timebin: Timebin::new(timebin_s),
    }
}

/// `count` consecutive detections starting at `start`, one per timebin.
pub fn consecutive(
    start: DateTime<FixedOffset>,
    count: i64,
    timebin_s: u32,
) -> Vec<DateTime<FixedOffset>> {
    (0..count)
        .map(|i| start + Duration::seconds(i * i64::from(timebin_s)))
        .collect()
}

pub fn selection(
    annotator: &str,
    label: &str,
    timebin_s: u32,
    starts: Vec<DateTime<FixedOffset>>,
) -> Selection {
    Selection::new(annotator, label, Timebin::new(timebin_s), starts)
}

/// Expert and detector annotations over two days, both at 10 s.
///
/// The expert marks whistles every morning at 08:00 and clicks at noon; the
/// detector fires on the same whistles plus a few false positives at night.
pub fn campaign_table() -> DetectionTable {
    let mut records = Vec::new();
    for day in ["2023-07-07", "2023-07-08"] {
        let morning = ts(&format!("{}T08:00:00+02:00", day));
        let noon = ts(&format!("{}T12:00:00+02:00", day));
        let night = ts(&format!("{}T23:00:00+02:00", day));

        for t in consecutive(morning, 30, 10) {
            records.push(record("expert", "Whistle", t, 10));
            records.push(record("detector", "Whistle", t, 10));
        }
        for t in consecutive(noon, 12, 10) {
            records.push(record("expert", "Click", t, 10));
        }
        for t in consecutive(night, 6, 10) {
            records.push(record("detector", "Whistle", t, 10));
        }
    }
    DetectionTable::new(records)
}
