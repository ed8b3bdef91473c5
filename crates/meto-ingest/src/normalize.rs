//! Normalize an Open-Meteo hourly response into observations

use crate::{IngestError, IngestResult};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use meto_core::{InvalidRecord, Location, Observation};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Local time layouts the upstream emits in `hourly.time`
const UPSTREAM_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Largest `utc_offset_seconds` magnitude accepted from upstream
const MAX_UTC_OFFSET_SECONDS: i64 = 86_400;

/// Result of normalizing one upstream response
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub records: Vec<Observation>,

    /// Length of the aligned prefix of the three hourly arrays
    pub requested: usize,

    /// Entries in the aligned prefix that could not be turned into records
    pub rejected: usize,
}

/// Turn the `hourly` block of an upstream body into observations at `location`.
///
/// The three hourly arrays are aligned by index and truncated to the
/// shortest. Null values become absent measurements. Entries with an
/// unparsable time or a non-numeric value are skipped and counted.
pub fn normalize(body: &Value, location: Location) -> IngestResult<Normalized> {
    let hourly = body
        .get("hourly")
        .and_then(Value::as_object)
        .filter(|hourly| !hourly.is_empty())
        .ok_or_else(|| malformed("response missing 'hourly' object"))?;

    let times = series(hourly, "time")?;
    let temperatures = series(hourly, "temperature_2m")?;
    let humidities = series(hourly, "relative_humidity_2m")?;

    let offset = utc_offset(body)?;

    let requested = times.len().min(temperatures.len()).min(humidities.len());
    if requested < times.len().max(temperatures.len()).max(humidities.len()) {
        debug!(
            times = times.len(),
            temperatures = temperatures.len(),
            humidities = humidities.len(),
            "Hourly arrays differ in length, truncating to {}",
            requested
        );
    }

    let mut records = Vec::with_capacity(requested);
    let mut rejected = 0;

    for ((time, temperature), humidity) in times.iter().zip(temperatures).zip(humidities) {
        match entry(time, temperature, humidity, offset, location) {
            Ok(record) => records.push(record),
            Err(reason) => {
                warn!(%reason, "skipping upstream entry");
                rejected += 1;
            }
        }
    }

    Ok(Normalized {
        records,
        requested,
        rejected,
    })
}

fn malformed(detail: &str) -> IngestError {
    IngestError::MalformedUpstreamResponse(detail.to_string())
}

fn utc_offset(body: &Value) -> IngestResult<i64> {
    match body.get("utc_offset_seconds") {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_i64()
            .filter(|offset| (-MAX_UTC_OFFSET_SECONDS..=MAX_UTC_OFFSET_SECONDS).contains(offset))
            .ok_or_else(|| malformed(&format!("'utc_offset_seconds' out of range: {}", value))),
    }
}

fn series<'a>(hourly: &'a Map<String, Value>, key: &str) -> IngestResult<&'a [Value]> {
    hourly
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| malformed(&format!("'hourly.{}' is missing or not an array", key)))
}

fn entry(
    time: &Value,
    temperature: &Value,
    humidity: &Value,
    offset_seconds: i64,
    location: Location,
) -> Result<Observation, InvalidRecord> {
    let at = upstream_time(time, offset_seconds)?;
    let temperature = measurement("temperature_2m", temperature)?;
    let humidity = measurement("relative_humidity_2m", humidity)?;
    Ok(Observation::new(at, temperature, humidity, location))
}

/// Resolve an upstream time to a UTC instant.
///
/// Offset-carrying strings are taken as-is; naive ones are local to the
/// response's `utc_offset_seconds`.
fn upstream_time(value: &Value, offset_seconds: i64) -> Result<DateTime<Utc>, InvalidRecord> {
    let raw = value.as_str().ok_or_else(|| InvalidRecord::UnexpectedValue {
        field: "time",
        value: value.to_string(),
    })?;

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }

    UPSTREAM_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|local| {
            let offset = Duration::try_seconds(offset_seconds)?;
            local.and_utc().checked_sub_signed(offset)
        })
        .ok_or_else(|| InvalidRecord::Timestamp(raw.to_string()))
}

fn measurement(field: &'static str, value: &Value) -> Result<Option<f64>, InvalidRecord> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| InvalidRecord::UnexpectedValue {
                field,
                value: n.to_string(),
            }),
        other => Err(InvalidRecord::UnexpectedValue {
            field,
            value: other.to_string(),
        }),
    }
}
