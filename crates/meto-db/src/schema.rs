//! Database schema for the observation table
//!
//! One row per (timestamp, latitude, longitude). The UNIQUE constraint is
//! what makes `INSERT OR IGNORE` an insert-if-absent.

use crate::{DbClient, DbResult};
use meto_core::Observation;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::{debug, instrument};

/// Observation table record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ObservationRow {
    /// Canonical UTC timestamp string
    pub timestamp: String,

    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<ObservationRow> for Observation {
    fn from(row: ObservationRow) -> Self {
        Observation {
            timestamp: row.timestamp,
            temperature: row.temperature,
            humidity: row.humidity,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

/// Table names
pub mod tables {
    pub const WEATHER: &str = "weather";
}

const CREATE_WEATHER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS weather (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    temperature REAL,
    humidity REAL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    UNIQUE(timestamp, latitude, longitude)
)
"#;

impl DbClient {
    /// Create the observation table if it does not exist yet.
    ///
    /// Must run once per process before the store is handed out.
    #[instrument(skip(self))]
    pub async fn init_schema(&self) -> DbResult<()> {
        sqlx::query(CREATE_WEATHER_TABLE)
            .execute(self.pool())
            .await?;

        debug!("Schema ready for table {}", tables::WEATHER);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let client = DbClient::in_memory().await.unwrap();
        client.init_schema().await.unwrap();
        client.init_schema().await.unwrap();
        assert_eq!(client.count_observations().await.unwrap(), 0);
    }

    #[test]
    fn test_row_into_observation() {
        let row = ObservationRow {
            timestamp: "2024-05-01T00:00:00Z".to_string(),
            temperature: Some(11.0),
            humidity: None,
            latitude: 47.37,
            longitude: 8.55,
        };
        let obs = Observation::from(row);
        assert_eq!(obs.timestamp, "2024-05-01T00:00:00Z");
        assert_eq!(obs.humidity, None);
        assert_eq!(obs.location().latitude, 47.37);
    }
}
