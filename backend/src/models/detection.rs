//! Detection records and the in-memory detection table.
//!
//! The table is built once from already-normalized records and never mutated
//! afterwards. Annotator, label and timebin listings are derived at
//! construction time and kept in ordered sets so every report sees the same
//! ordering.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::time::Timebin;
use crate::error::{AnalysisError, AnalysisResult, ErrorContext};

/// One observed acoustic event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub dataset: String,
    pub annotator: String,
    pub label: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    #[serde(rename = "timebin_duration")]
    pub timebin: Timebin,
}

/// Labels, timebins and datasets used by one annotator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorMetadata {
    pub annotator: String,
    pub labels: BTreeSet<String>,
    pub timebins: BTreeSet<Timebin>,
    pub datasets: BTreeSet<String>,
    /// Timebins observed for each label of this annotator.
    pub label_timebins: BTreeMap<String, BTreeSet<Timebin>>,
    pub detection_count: usize,
}

impl AnnotatorMetadata {
    fn new(annotator: &str) -> Self {
        Self {
            annotator: annotator.to_string(),
            ..Default::default()
        }
    }

    fn observe(&mut self, record: &DetectionRecord) {
        self.labels.insert(record.label.clone());
        self.timebins.insert(record.timebin);
        self.datasets.insert(record.dataset.clone());
        self.label_timebins
            .entry(record.label.clone())
            .or_default()
            .insert(record.timebin);
        self.detection_count += 1;
    }

    /// The single timebin used by this annotator, if it is uniform.
    pub fn uniform_timebin(&self) -> Option<Timebin> {
        if self.timebins.len() == 1 {
            self.timebins.iter().next().copied()
        } else {
            None
        }
    }

    /// The single timebin used for `label`, if it is uniform.
    pub fn timebin_for(&self, label: &str) -> Option<Timebin> {
        let timebins = self.label_timebins.get(label)?;
        if timebins.len() == 1 {
            timebins.iter().next().copied()
        } else {
            None
        }
    }
}

/// Detections of one annotator for one label, sharing one timebin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub annotator: String,
    pub label: String,
    pub timebin: Timebin,
    pub start_times: Vec<DateTime<FixedOffset>>,
}

impl Selection {
    pub fn new(
        annotator: impl Into<String>,
        label: impl Into<String>,
        timebin: Timebin,
        start_times: Vec<DateTime<FixedOffset>>,
    ) -> Self {
        Self {
            annotator: annotator.into(),
            label: label.into(),
            timebin,
            start_times,
        }
    }

    pub fn len(&self) -> usize {
        self.start_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start_times.is_empty()
    }

    /// `annotator/label`, as used in report titles and error context.
    pub fn name(&self) -> String {
        format!("{}/{}", self.annotator, self.label)
    }
}

/// Read-only snapshot of all loaded detections.
#[derive(Debug, Clone, Default)]
pub struct DetectionTable {
    records: Vec<DetectionRecord>,
    metadata: BTreeMap<String, AnnotatorMetadata>,
    labels: BTreeSet<String>,
}

impl DetectionTable {
    pub fn new(records: Vec<DetectionRecord>) -> Self {
        let mut metadata: BTreeMap<String, AnnotatorMetadata> = BTreeMap::new();
        let mut labels = BTreeSet::new();

        for record in &records {
            metadata
                .entry(record.annotator.clone())
                .or_insert_with(|| AnnotatorMetadata::new(&record.annotator))
                .observe(record);
            labels.insert(record.label.clone());
        }

        log::debug!(
            "Detection table built: {} records, {} annotators, {} labels",
            records.len(),
            metadata.len(),
            labels.len()
        );

        Self {
            records,
            metadata,
            labels,
        }
    }

    pub fn records(&self) -> &[DetectionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct annotators, in lexical order.
    pub fn annotators(&self) -> Vec<&str> {
        self.metadata.keys().map(String::as_str).collect()
    }

    /// Distinct labels across all annotators, in lexical order.
    pub fn labels(&self) -> Vec<&str> {
        self.labels.iter().map(String::as_str).collect()
    }

    pub fn metadata(&self, annotator: &str) -> Option<&AnnotatorMetadata> {
        self.metadata.get(annotator)
    }

    /// Offset of the first record; the table's native timezone.
    pub fn offset(&self) -> Option<FixedOffset> {
        self.records.first().map(|r| *r.start_time.offset())
    }

    /// Earliest and latest detection start.
    pub fn time_span(&self) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
        let first = self.records.iter().map(|r| r.start_time).min()?;
        let last = self.records.iter().map(|r| r.start_time).max()?;
        Some((first, last))
    }

    /// Extract the detections of `annotator` for `label`.
    ///
    /// # Errors
    /// - `InsufficientData` if the pair has no detections.
    /// - `TimebinMismatch` if the pair mixes several timebins.
    pub fn selection(&self, annotator: &str, label: &str) -> AnalysisResult<Selection> {
        let context = ErrorContext::new("selection").with_selection(annotator, label);

        let meta = self.metadata.get(annotator).ok_or_else(|| {
            AnalysisError::InsufficientData {
                message: format!("annotator '{}' has no detections", annotator),
                context: context.clone(),
            }
        })?;

        let timebins = meta.label_timebins.get(label).ok_or_else(|| {
            AnalysisError::InsufficientData {
                message: format!("annotator '{}' never used label '{}'", annotator, label),
                context: context.clone(),
            }
        })?;

        let timebin = match meta.timebin_for(label) {
            Some(timebin) => timebin,
            None => {
                let listed: Vec<String> = timebins.iter().map(|t| t.to_string()).collect();
                return Err(AnalysisError::TimebinMismatch {
                    message: format!(
                        "detections of {}/{} mix several timebins: {}",
                        annotator,
                        label,
                        listed.join(", ")
                    ),
                    context,
                });
            }
        };

        let start_times = self
            .records
            .iter()
            .filter(|r| r.annotator == annotator && r.label == label)
            .map(|r| r.start_time)
            .collect();

        Ok(Selection::new(annotator, label, timebin, start_times))
    }
}

impl From<Vec<DetectionRecord>> for DetectionTable {
    fn from(records: Vec<DetectionRecord>) -> Self {
        DetectionTable::new(records)
    }
}
