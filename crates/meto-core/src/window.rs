//! Rolling time window selection

use chrono::{DateTime, Duration, SubsecRound, Utc};

use crate::{Location, Observation, ObservationStore, StoreError};

/// Default export window in hours
pub const DEFAULT_WINDOW_HOURS: u32 = 48;

/// Observations for "the last N hours", recomputed on every read
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Instant the window was requested at
    pub requested_at: DateTime<Utc>,
    pub hours: u32,
    pub location: Option<Location>,
    /// Ascending by timestamp
    pub observations: Vec<Observation>,
}

impl Window {
    /// Lower bound actually used for the query
    pub fn since(&self) -> DateTime<Utc> {
        window_start(self.requested_at, self.hours)
    }

    /// Requested bounds, independent of which rows were found
    pub fn requested_range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.requested_at - Duration::hours(i64::from(self.hours)),
            self.requested_at,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }
}

/// `now - hours`, truncated to whole seconds
pub fn window_start(now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    (now - Duration::hours(i64::from(hours))).trunc_subsecs(0)
}

/// Select the window ending now
pub async fn select_window(
    store: &dyn ObservationStore,
    hours: u32,
    location: Option<Location>,
) -> Result<Window, StoreError> {
    select_window_at(store, Utc::now(), hours, location).await
}

/// Select the window ending at `now`
pub async fn select_window_at(
    store: &dyn ObservationStore,
    now: DateTime<Utc>,
    hours: u32,
    location: Option<Location>,
) -> Result<Window, StoreError> {
    let since = window_start(now, hours);
    let observations = store.query_window(since, location).await?;
    Ok(Window {
        requested_at: now,
        hours,
        location,
        observations,
    })
}
