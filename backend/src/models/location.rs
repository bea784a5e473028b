use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult, ErrorContext};

/// Field names as presented to the person entering the coordinates.
pub const LATITUDE_FIELD: &str = "Lat Decimal Degree";
pub const LONGITUDE_FIELD: &str = "Lon Decimal Degree";

/// Geographic location of a recording site, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeographicLocation {
    /// Build a location from numeric coordinates, checking their range.
    pub fn new(latitude: f64, longitude: f64) -> AnalysisResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AnalysisError::InvalidParameter {
                message: format!("latitude {} is outside [-90, 90]", latitude),
                context: ErrorContext::new("location").with_details(LATITUDE_FIELD),
            });
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AnalysisError::InvalidParameter {
                message: format!("longitude {} is outside [-180, 180]", longitude),
                context: ErrorContext::new("location").with_details(LONGITUDE_FIELD),
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parse the two free-text coordinate fields.
    ///
    /// Every blank field is reported in the same error so it can be shown
    /// back to the user at once.
    pub fn from_fields(latitude: &str, longitude: &str) -> AnalysisResult<Self> {
        let fields = [(LATITUDE_FIELD, latitude), (LONGITUDE_FIELD, longitude)];

        let missing: Vec<String> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| format!("\"{}\" is a required field.", name))
            .collect();
        if !missing.is_empty() {
            return Err(AnalysisError::InvalidParameter {
                message: missing.join(" "),
                context: ErrorContext::new("location"),
            });
        }

        let lat = parse_degrees(LATITUDE_FIELD, latitude)?;
        let lon = parse_degrees(LONGITUDE_FIELD, longitude)?;
        Self::new(lat, lon)
    }
}

fn parse_degrees(field: &str, value: &str) -> AnalysisResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| AnalysisError::InvalidParameter {
            message: format!("\"{}\" must be a decimal degree value: {}", field, e),
            context: ErrorContext::new("location").with_details(value.trim()),
        })
}
