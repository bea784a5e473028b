//! Detection counts per label and per annotator.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::DetectionTable;

/// Cross-tabulated detection counts.
///
/// Both tables are dense: every (label, annotator) pair present in the table
/// has an entry, zero when the annotator never used the label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionOverview {
    /// label -> annotator -> count
    pub by_label: BTreeMap<String, BTreeMap<String, usize>>,
    /// annotator -> label -> count
    pub by_annotator: BTreeMap<String, BTreeMap<String, usize>>,
    pub total: usize,
}

impl DetectionOverview {
    pub fn count(&self, annotator: &str, label: &str) -> usize {
        self.by_annotator
            .get(annotator)
            .and_then(|labels| labels.get(label))
            .copied()
            .unwrap_or(0)
    }

    /// Total detections of `label` over every annotator.
    pub fn label_total(&self, label: &str) -> usize {
        self.by_label
            .get(label)
            .map(|row| row.values().sum())
            .unwrap_or(0)
    }

    pub fn annotator_total(&self, annotator: &str) -> usize {
        self.by_annotator
            .get(annotator)
            .map(|row| row.values().sum())
            .unwrap_or(0)
    }
}

pub fn summarize(table: &DetectionTable) -> DetectionOverview {
    let annotators = table.annotators();
    let labels = table.labels();

    let mut by_label: BTreeMap<String, BTreeMap<String, usize>> = labels
        .iter()
        .map(|label| {
            let row = annotators.iter().map(|a| (a.to_string(), 0)).collect();
            (label.to_string(), row)
        })
        .collect();
    let mut by_annotator: BTreeMap<String, BTreeMap<String, usize>> = annotators
        .iter()
        .map(|annotator| {
            let row = labels.iter().map(|l| (l.to_string(), 0)).collect();
            (annotator.to_string(), row)
        })
        .collect();

    for record in table.records() {
        if let Some(count) = by_label
            .get_mut(&record.label)
            .and_then(|row| row.get_mut(&record.annotator))
        {
            *count += 1;
        }
        if let Some(count) = by_annotator
            .get_mut(&record.annotator)
            .and_then(|row| row.get_mut(&record.label))
        {
            *count += 1;
        }
    }

    log::debug!(
        "Overview: {} detections, {} annotators, {} labels",
        table.len(),
        annotators.len(),
        labels.len()
    );

    DetectionOverview {
        by_label,
        by_annotator,
        total: table.len(),
    }
}
