//! In-memory observation store: a key set guarding an append log

use chrono::{DateTime, Utc};
use meto_core::{canonical_timestamp, Location, Observation, ObservationKey, ObservationStore, StoreError};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, warn};

#[derive(Default)]
struct Inner {
    keys: HashSet<ObservationKey>,
    log: Vec<Observation>,
}

/// Process-local store with the same insert-if-absent contract as `DbClient`
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.log.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl ObservationStore for MemoryStore {
    async fn insert_batch(&self, records: &[Observation]) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        let mut inserted = 0u64;

        for record in records {
            if let Err(reason) = record.validate() {
                warn!(timestamp = %record.timestamp, %reason, "skipping invalid record");
                continue;
            }
            if inner.keys.insert(record.key()) {
                inner.log.push(record.clone());
                inserted += 1;
            }
        }

        debug!("Inserted {} of {} records", inserted, records.len());
        Ok(inserted)
    }

    async fn query_window(
        &self,
        since: DateTime<Utc>,
        location: Option<Location>,
    ) -> Result<Vec<Observation>, StoreError> {
        let since = canonical_timestamp(since);
        let inner = self.lock()?;

        let mut rows: Vec<Observation> = inner
            .log
            .iter()
            .filter(|obs| obs.timestamp >= since)
            .filter(|obs| match location {
                Some(loc) => obs.latitude == loc.latitude && obs.longitude == loc.longitude,
                None => true,
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.latitude.total_cmp(&b.latitude))
                .then(a.longitude.total_cmp(&b.longitude))
        });
        Ok(rows)
    }
}
