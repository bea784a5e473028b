//! Report configuration file support.
//!
//! A run is described by a TOML file: the analysis window, the overflow
//! policy, the recording site and which reports to produce. Every report
//! section is optional.
//!
//! ```toml
//! overflow_policy = "flag"
//!
//! [window]
//! begin = "2023-02-11T12:00:00+01:00"
//! end = "2023-02-13T12:00:00+01:00"
//!
//! [location]
//! latitude = "47.5"
//! longitude = "-3.2"
//!
//! [[seasonality]]
//! annotator = "mdupont"
//! label = "Whistle"
//! resolution = { mode = "minutes", bin_minutes = 60 }
//!
//! [comparison]
//! a = { annotator = "mdupont", label = "Whistle" }
//! b = { annotator = "detector", label = "Whistle" }
//! ```

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::{ReportBundle, ReportFailure};
use crate::error::{AnalysisError, AnalysisResult, ErrorContext};
use crate::models::{DetectionTable, GeographicLocation};
use crate::services::diel::FixedSunTimes;
use crate::services::overview::summarize;
use crate::services::reports::{
    annotator_comparison, diel_heatmap_report, diel_scatter_report, multilabel_report,
    seasonality_report, ReportWindow, SelectionKey, DEFAULT_MAX_LABELS,
};
use crate::services::{OverflowPolicy, Resolution};

pub const CONFIG_FILE_NAME: &str = "report.toml";

/// Report configuration from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub window: WindowSettings,
    /// Detection snapshot to load when `DETECTIONS_JSON` is not set.
    #[serde(default)]
    pub detections: Option<PathBuf>,
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
    #[serde(default)]
    pub location: LocationSettings,
    #[serde(default)]
    pub seasonality: Vec<SeasonalitySettings>,
    #[serde(default)]
    pub multilabel: Option<MultilabelSettings>,
    #[serde(default)]
    pub comparison: Option<ComparisonSettings>,
    #[serde(default)]
    pub diel: Option<DielSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSettings {
    pub begin: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Recording site, kept as the raw text entered for each coordinate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationSettings {
    #[serde(default)]
    pub latitude: String,
    #[serde(default)]
    pub longitude: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalitySettings {
    pub annotator: String,
    pub label: String,
    #[serde(default = "default_resolution")]
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultilabelSettings {
    pub annotator: String,
    #[serde(default = "default_bin_minutes")]
    pub bin_minutes: u32,
    #[serde(default = "default_max_labels")]
    pub max_labels: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSettings {
    pub a: SelectionKey,
    pub b: SelectionKey,
    #[serde(default = "default_bin_minutes")]
    pub bin_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DielSettings {
    pub annotator: String,
    pub label: String,
    #[serde(default = "default_sunrise_hour")]
    pub sunrise_hour: f64,
    #[serde(default = "default_sunset_hour")]
    pub sunset_hour: f64,
    #[serde(default = "default_true")]
    pub scatter: bool,
    #[serde(default = "default_true")]
    pub heatmap: bool,
}

fn default_resolution() -> Resolution {
    Resolution::Minutes {
        bin_minutes: default_bin_minutes(),
    }
}

fn default_bin_minutes() -> u32 {
    60
}

fn default_max_labels() -> usize {
    DEFAULT_MAX_LABELS
}

fn default_sunrise_hour() -> f64 {
    6.0
}

fn default_sunset_hour() -> f64 {
    18.0
}

fn default_true() -> bool {
    true
}

impl ReportConfig {
    /// Load report configuration from a TOML file.
    ///
    /// # Errors
    /// `Configuration` if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| AnalysisError::Configuration {
            message: format!("Failed to read config file: {}", e),
            context: ErrorContext::new("load_config").with_details(path.display().to_string()),
        })?;

        Self::from_toml_str(&content)
            .map_err(|e| e.with_details(path.display().to_string()))
    }

    pub fn from_toml_str(content: &str) -> AnalysisResult<Self> {
        toml::from_str(content).map_err(|e| AnalysisError::Configuration {
            message: format!("Failed to parse config file: {}", e),
            context: ErrorContext::new("load_config"),
        })
    }

    /// Load report configuration from the default location.
    ///
    /// Searches for `report.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> AnalysisResult<Self> {
        let search_paths = [
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from("backend").join(CONFIG_FILE_NAME),
            PathBuf::from("..").join(CONFIG_FILE_NAME),
        ];

        for path in &search_paths {
            if path.exists() {
                log::debug!("Using report configuration {}", path.display());
                return Self::from_file(path);
            }
        }

        Err(AnalysisError::configuration(format!(
            "No {} found in standard locations",
            CONFIG_FILE_NAME
        )))
    }

    pub fn window(&self) -> AnalysisResult<ReportWindow> {
        ReportWindow::new(self.window.begin, self.window.end)
    }

    /// Parse the recording site; both coordinates are required.
    pub fn location(&self) -> AnalysisResult<GeographicLocation> {
        GeographicLocation::from_fields(&self.location.latitude, &self.location.longitude)
    }

    /// Run every configured report against `table`.
    ///
    /// Parameters are checked for all sections before any report runs, and a
    /// bad parameter fails the whole run. A report that fails on the data
    /// (unknown selection, too few annotators or labels, mixed timebins,
    /// rejected overflow) is recorded in [`ReportBundle::failures`] and the
    /// remaining reports still run.
    pub fn run(&self, table: &DetectionTable) -> AnalysisResult<ReportBundle> {
        let window = self.window()?;
        for section in &self.seasonality {
            section.resolution.validate()?;
        }
        if let Some(section) = &self.multilabel {
            Resolution::minutes(section.bin_minutes)?;
            if section.max_labels == 0 {
                return Err(AnalysisError::InvalidParameter {
                    message: "max_labels must be at least 1".to_string(),
                    context: ErrorContext::new("run_reports").with_details("multilabel"),
                });
            }
        }
        if let Some(section) = &self.comparison {
            Resolution::minutes(section.bin_minutes)?;
        }
        let diel = match &self.diel {
            Some(settings) if settings.scatter || settings.heatmap => Some((
                settings,
                self.location()?,
                FixedSunTimes::new(settings.sunrise_hour, settings.sunset_hour)?,
            )),
            _ => None,
        };

        let mut bundle = ReportBundle {
            overview: summarize(table),
            ..Default::default()
        };

        for section in &self.seasonality {
            let report = seasonality_report(
                table,
                &SelectionKey::new(section.annotator.as_str(), section.label.as_str()),
                &window,
                section.resolution,
                self.overflow_policy,
            );
            if let Some(report) = keep(&mut bundle, "seasonality", report) {
                bundle.seasonality.push(report);
            }
        }

        if let Some(section) = &self.multilabel {
            let report = multilabel_report(
                table,
                &section.annotator,
                &window,
                section.bin_minutes,
                section.max_labels,
                self.overflow_policy,
            );
            bundle.multilabel = keep(&mut bundle, "multilabel", report);
        }

        if let Some(section) = &self.comparison {
            let report = annotator_comparison(
                table,
                &section.a,
                &section.b,
                &window,
                section.bin_minutes,
                self.overflow_policy,
            );
            bundle.comparison = keep(&mut bundle, "comparison", report);
        }

        if let Some((settings, location, provider)) = diel {
            let key = SelectionKey::new(settings.annotator.as_str(), settings.label.as_str());
            if settings.scatter {
                let report = diel_scatter_report(table, &key, &window, &location, &provider);
                bundle.diel_scatter = keep(&mut bundle, "diel_scatter", report);
            }
            if settings.heatmap {
                let report = diel_heatmap_report(table, &key, &window, &location, &provider);
                bundle.diel_heatmap = keep(&mut bundle, "diel_heatmap", report);
            }
        }

        if !bundle.is_complete() {
            log::warn!("{} report(s) could not be produced", bundle.failures.len());
        }

        Ok(bundle)
    }
}

/// Unwrap a report result, recording a failure in the bundle.
fn keep<T>(bundle: &mut ReportBundle, section: &str, result: AnalysisResult<T>) -> Option<T> {
    match result {
        Ok(report) => Some(report),
        Err(err) => {
            log::warn!("Skipping {} report: {}", section, err);
            bundle.failures.push(ReportFailure::new(section, &err));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[window]
begin = "2023-02-11T12:00:00+01:00"
end = "2023-02-11T15:00:00+01:00"
"#;

    #[test]
    fn test_parse_minimal_config() {
        let config = ReportConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.overflow_policy, OverflowPolicy::Flag);
        assert!(config.seasonality.is_empty());
        assert!(config.comparison.is_none());
        assert!(config.detections.is_none());
        assert!(config.window().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
overflow_policy = "clamp"
detections = "detections.json"

[window]
begin = "2023-02-11T12:00:00+01:00"
end = "2023-03-11T12:00:00+01:00"

[location]
latitude = "47.5"
longitude = "-3.2"

[[seasonality]]
annotator = "mdupont"
label = "Whistle"
resolution = { mode = "months" }

[[seasonality]]
annotator = "mdupont"
label = "Click"

[multilabel]
annotator = "mdupont"

[comparison]
a = { annotator = "mdupont", label = "Whistle" }
b = { annotator = "detector", label = "Whistle" }
bin_minutes = 10

[diel]
annotator = "mdupont"
label = "Whistle"
sunrise_hour = 7.5
heatmap = false
"#;

        let config = ReportConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.overflow_policy, OverflowPolicy::Clamp);
        assert_eq!(config.seasonality.len(), 2);
        assert_eq!(config.seasonality[0].resolution, Resolution::Months);
        assert_eq!(
            config.seasonality[1].resolution,
            Resolution::Minutes { bin_minutes: 60 }
        );

        let multilabel = config.multilabel.as_ref().unwrap();
        assert_eq!(multilabel.max_labels, 3);
        assert_eq!(multilabel.bin_minutes, 60);

        let comparison = config.comparison.as_ref().unwrap();
        assert_eq!(comparison.b.annotator, "detector");
        assert_eq!(comparison.bin_minutes, 10);

        let diel = config.diel.as_ref().unwrap();
        assert_eq!(diel.sunrise_hour, 7.5);
        assert_eq!(diel.sunset_hour, 18.0);
        assert!(diel.scatter);
        assert!(!diel.heatmap);

        let location = config.location().unwrap();
        assert_eq!(location.latitude, 47.5);
    }

    #[test]
    fn test_parse_invalid_toml() {
        let err = ReportConfig::from_toml_str("[window\nbegin = 1").unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION");
    }

    #[test]
    fn test_missing_window() {
        let err = ReportConfig::from_toml_str("overflow_policy = \"reject\"").unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = ReportConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.window.begin,
            DateTime::parse_from_rfc3339("2023-02-11T12:00:00+01:00").unwrap()
        );
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReportConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION");
        assert!(err.context().details.is_some());
    }

    #[test]
    fn test_blank_location_names_required_fields() {
        let config = ReportConfig::from_toml_str(MINIMAL).unwrap();
        let err = config.location().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("\"Lat Decimal Degree\" is a required field."));
        assert!(message.contains("\"Lon Decimal Degree\" is a required field."));
    }

    #[test]
    fn test_run_requires_location_for_diel() {
        let toml = format!(
            "{}\n[diel]\nannotator = \"mdupont\"\nlabel = \"Whistle\"\n",
            MINIMAL
        );
        let config = ReportConfig::from_toml_str(&toml).unwrap();
        let err = config.run(&DetectionTable::default()).unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_run_records_failed_report() {
        let toml = format!(
            "{}\n[multilabel]\nannotator = \"mdupont\"\n",
            MINIMAL
        );
        let config = ReportConfig::from_toml_str(&toml).unwrap();
        let bundle = config.run(&DetectionTable::default()).unwrap();

        assert!(bundle.multilabel.is_none());
        assert_eq!(bundle.failures.len(), 1);
        assert_eq!(bundle.failures[0].section, "multilabel");
        assert_eq!(bundle.failures[0].code, "INSUFFICIENT_DATA");
    }

    #[test]
    fn test_run_overview_only() {
        let config = ReportConfig::from_toml_str(MINIMAL).unwrap();
        let bundle = config.run(&DetectionTable::default()).unwrap();
        assert_eq!(bundle.overview.total, 0);
        assert!(bundle.seasonality.is_empty());
        assert!(bundle.diel_heatmap.is_none());
        assert!(bundle.is_complete());
    }
}
