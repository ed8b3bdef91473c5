//! Query operations for the observation table

use crate::schema::ObservationRow;
use crate::{DbClient, DbResult};
use chrono::{DateTime, Utc};
use meto_core::{canonical_timestamp, Location, Observation, ObservationStore, StoreError};
use sqlx::Row;
use tracing::{debug, instrument, warn};

impl DbClient {
    /// Insert each valid record if its key is not stored yet.
    ///
    /// Invalid records are skipped with a warning. Returns the number of
    /// rows actually written; duplicates do not count.
    #[instrument(skip(self, records), fields(batch = records.len()))]
    pub async fn insert_batch(&self, records: &[Observation]) -> DbResult<u64> {
        let mut tx = self.pool().begin().await?;
        let mut inserted = 0u64;

        for record in records {
            if let Err(reason) = record.validate() {
                warn!(timestamp = %record.timestamp, %reason, "skipping invalid record");
                continue;
            }

            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO weather (timestamp, temperature, humidity, latitude, longitude)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.timestamp)
            .bind(record.temperature)
            .bind(record.humidity)
            .bind(record.latitude)
            .bind(record.longitude)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;

        debug!("Inserted {} of {} records", inserted, records.len());
        Ok(inserted)
    }

    /// Get observations at or after `since`, optionally for one location
    #[instrument(skip(self))]
    pub async fn query_window(
        &self,
        since: DateTime<Utc>,
        location: Option<Location>,
    ) -> DbResult<Vec<Observation>> {
        let since = canonical_timestamp(since);

        let rows = match location {
            None => {
                sqlx::query_as::<_, ObservationRow>(
                    r#"
                    SELECT timestamp, temperature, humidity, latitude, longitude
                    FROM weather
                    WHERE timestamp >= ?
                    ORDER BY timestamp ASC, latitude ASC, longitude ASC
                    "#,
                )
                .bind(&since)
                .fetch_all(self.pool())
                .await?
            }
            Some(loc) => {
                sqlx::query_as::<_, ObservationRow>(
                    r#"
                    SELECT timestamp, temperature, humidity, latitude, longitude
                    FROM weather
                    WHERE timestamp >= ? AND latitude = ? AND longitude = ?
                    ORDER BY timestamp ASC
                    "#,
                )
                .bind(&since)
                .bind(loc.latitude)
                .bind(loc.longitude)
                .fetch_all(self.pool())
                .await?
            }
        };

        debug!("Retrieved {} observations since {}", rows.len(), since);
        Ok(rows.into_iter().map(Observation::from).collect())
    }

    /// Get count of stored observations
    #[instrument(skip(self))]
    pub async fn count_observations(&self) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM weather")
            .fetch_one(self.pool())
            .await?;

        Ok(row.get("count"))
    }
}

#[async_trait::async_trait]
impl ObservationStore for DbClient {
    async fn insert_batch(&self, records: &[Observation]) -> Result<u64, StoreError> {
        Ok(DbClient::insert_batch(self, records).await?)
    }

    async fn query_window(
        &self,
        since: DateTime<Utc>,
        location: Option<Location>,
    ) -> Result<Vec<Observation>, StoreError> {
        Ok(DbClient::query_window(self, since, location).await?)
    }
}
