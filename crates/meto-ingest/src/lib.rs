//! Upstream ingestion for the weather service
//!
//! Fetches hourly forecast data for one location, normalizes it into
//! observations and hands the batch to the store.

pub mod normalize;
pub mod openmeteo;

pub use normalize::{normalize, Normalized};
pub use openmeteo::{OpenMeteoClient, HOURLY_VARIABLES, OPEN_METEO_FORECAST};

use meto_core::{FetchError, FetchRequest, Fetcher, Location, ObservationStore, StoreError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

/// Errors from a single ingest run
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(FetchError),

    #[error("Malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<FetchError> for IngestError {
    fn from(err: FetchError) -> Self {
        match err {
            // a 2xx body that is not JSON is a response problem, not an outage
            FetchError::Decode(detail) => IngestError::MalformedUpstreamResponse(detail),
            other => IngestError::UpstreamUnavailable(other),
        }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Outcome of one ingest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Aligned entries found in the upstream response
    pub requested: usize,

    /// Entries dropped during normalization
    pub rejected: usize,

    /// Rows newly written to the store
    pub inserted: u64,
}

/// Fetch-normalize-store pipeline for one location at a time
pub struct Ingestor {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ObservationStore>,
    timezone: String,
}

impl Ingestor {
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn ObservationStore>) -> Self {
        Self {
            fetcher,
            store,
            timezone: "UTC".to_string(),
        }
    }

    /// Timezone the upstream is asked to report local times in
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Run one ingest for `location` covering the last `past_days` days.
    ///
    /// Nothing is written if the fetch or the response shape fails. A
    /// repeated run over the same period inserts zero rows.
    #[instrument(skip(self), fields(lat = location.latitude, lon = location.longitude))]
    pub async fn ingest(&self, location: Location, past_days: u32) -> IngestResult<IngestSummary> {
        let request = FetchRequest {
            location,
            past_days,
            timezone: self.timezone.clone(),
        };

        let body = self.fetcher.fetch(&request).await?;
        let normalized = normalize(&body, location)?;
        let inserted = self.store.insert_batch(&normalized.records).await?;

        let summary = IngestSummary {
            requested: normalized.requested,
            rejected: normalized.rejected,
            inserted,
        };

        info!(
            requested = summary.requested,
            rejected = summary.rejected,
            inserted = summary.inserted,
            "Ingest complete"
        );
        Ok(summary)
    }
}
