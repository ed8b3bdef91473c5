//! Observation store
//!
//! SQLite-backed `DbClient` and the in-memory `MemoryStore` both implement
//! the insert-if-absent contract of `ObservationStore`. The schema is
//! created by an explicit `init_schema` call before first use.

pub mod client;
pub mod memory;
pub mod queries;
pub mod schema;

pub use client::*;
pub use memory::*;
pub use schema::*;

use meto_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}
