//! Core data types for weather observations

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Storage format for timestamps; fixed width so lexical order is time order
pub const CANONICAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Naive formats accepted when reading timestamps back, interpreted as UTC
const NAIVE_TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Plausible air temperature bounds in °C
pub const TEMPERATURE_RANGE: (f64, f64) = (-100.0, 100.0);

/// A geographic point; the location half of the observation key
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "lat")]
    pub latitude: f64,

    #[serde(rename = "lon")]
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a location filter from optional query parameters.
    ///
    /// Both coordinates must be present, a lone latitude or longitude
    /// selects every location.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Some(Self::new(lat, lon)),
            _ => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lat={}, lon={}", self.latitude, self.longitude)
    }
}

/// Hourly weather observation at a geographic point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// UTC instant in canonical form (`2024-05-01T13:00:00Z`)
    pub timestamp: String,

    /// Air temperature, degrees Celsius
    pub temperature: Option<f64>,

    /// Relative humidity, percent
    pub humidity: Option<f64>,

    pub latitude: f64,
    pub longitude: f64,
}

impl Observation {
    pub fn new(
        at: DateTime<Utc>,
        temperature: Option<f64>,
        humidity: Option<f64>,
        location: Location,
    ) -> Self {
        Self {
            timestamp: canonical_timestamp(at),
            temperature,
            humidity,
            latitude: location.latitude,
            longitude: location.longitude,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.latitude, self.longitude)
    }

    /// Parse the stored timestamp into an instant, if it is parseable at all
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Natural key of this observation
    pub fn key(&self) -> ObservationKey {
        ObservationKey {
            timestamp: self.timestamp.clone(),
            latitude_bits: coordinate_bits(self.latitude),
            longitude_bits: coordinate_bits(self.longitude),
        }
    }

    /// Basic validation applied before a record is persisted
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        let canonical = NaiveDateTime::parse_from_str(&self.timestamp, CANONICAL_TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| canonical_timestamp(naive.and_utc()));
        if canonical.as_deref() != Some(self.timestamp.as_str()) {
            return Err(InvalidRecord::Timestamp(self.timestamp.clone()));
        }
        check_range("latitude", self.latitude, -90.0, 90.0)?;
        check_range("longitude", self.longitude, -180.0, 180.0)?;
        if let Some(t) = self.temperature {
            let (min, max) = TEMPERATURE_RANGE;
            check_range("temperature", t, min, max)?;
        }
        if let Some(h) = self.humidity {
            check_range("humidity", h, 0.0, 100.0)?;
        }
        Ok(())
    }
}

/// Uniqueness key: (timestamp, latitude, longitude)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObservationKey {
    timestamp: String,
    latitude_bits: u64,
    longitude_bits: u64,
}

// -0.0 and 0.0 name the same coordinate
fn coordinate_bits(value: f64) -> u64 {
    (value + 0.0).to_bits()
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), InvalidRecord> {
    if !value.is_finite() {
        return Err(InvalidRecord::NonFinite { field });
    }
    if value < min || value > max {
        return Err(InvalidRecord::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// A single record that failed validation; always recovered by skipping it
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidRecord {
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },

    #[error("{field} value {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("unparsable timestamp '{0}'")]
    Timestamp(String),

    #[error("unexpected value for {field}: {value}")]
    UnexpectedValue { field: &'static str, value: String },
}

/// Render an instant in the canonical storage form
pub fn canonical_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Lenient timestamp parsing for reading rows back
///
/// Accepts RFC 3339 with any offset and a few naive layouts, which are
/// taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// One row of the tabular export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub timestamp: String,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&Observation> for TableRow {
    fn from(obs: &Observation) -> Self {
        Self {
            timestamp: obs.timestamp.clone(),
            temperature: obs.temperature,
            humidity: obs.humidity,
            latitude: obs.latitude,
            longitude: obs.longitude,
        }
    }
}

/// Fixed-column table handed to a tabular sink
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub sheet_name: String,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub const COLUMNS: [&'static str; 5] = [
        "timestamp",
        "temperature_2m",
        "relative_humidity_2m",
        "latitude",
        "longitude",
    ];
}

/// 8-bit RGB raster, row-major, no padding
#[derive(Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgb.len())
            .finish()
    }
}

/// Title, metadata lines and an optional image, handed to a document sink
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPayload {
    pub title: String,
    pub lines: Vec<String>,
    pub image: Option<RasterImage>,
}
