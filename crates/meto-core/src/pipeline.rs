use anyhow::Result;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{DocumentPayload, Location, Observation, Table};

/// Persistence layer failure; fatal to the calling request
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by the upstream fetch collaborator
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("upstream body is not valid JSON: {0}")]
    Decode(String),
}

/// Parameters for a single upstream fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub location: Location,
    pub past_days: u32,
    pub timezone: String,
}

/// Durable keyed store of observations.
///
/// Inserts are insert-if-absent on (timestamp, latitude, longitude); the
/// first row written for a key wins and is never updated.
#[async_trait::async_trait]
pub trait ObservationStore: Send + Sync {
    /// Persist each valid record independently, returning how many were new
    async fn insert_batch(&self, records: &[Observation]) -> Result<u64, StoreError>;

    /// Observations with `timestamp >= since`, ascending by timestamp
    async fn query_window(
        &self,
        since: DateTime<Utc>,
        location: Option<Location>,
    ) -> Result<Vec<Observation>, StoreError>;
}

/// Upstream forecast provider returning its raw JSON body
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<serde_json::Value, FetchError>;
}

pub trait TabularSink: Send + Sync {
    fn write_table(&self, table: &Table) -> Result<Vec<u8>>;
}

pub trait DocumentSink: Send + Sync {
    fn write_document(&self, document: &DocumentPayload) -> Result<Vec<u8>>;
}
