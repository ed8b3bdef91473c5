//! Database client and connection management

use crate::{DbError, DbResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Database client wrapping a sqlx SQLite connection pool
#[derive(Clone)]
pub struct DbClient {
    pool: SqlitePool,
}

impl DbClient {
    /// Create a new database client from a connection string
    pub async fn new(database_url: &str) -> DbResult<Self> {
        let opts = DbConnectionBuilder::new(database_url).build()?;
        Self::with_options(opts, 5).await
    }

    /// Create a new database client with custom options
    pub async fn with_options(opts: SqliteConnectOptions, max_connections: u32) -> DbResult<Self> {
        if max_connections == 0 {
            return Err(DbError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(opts)
            .await?;

        Ok(Self { pool })
    }

    /// Private in-memory database.
    ///
    /// The database lives only as long as a connection to it, so the pool
    /// is pinned to one connection that never expires.
    pub async fn in_memory() -> DbResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;

        Ok(Self { pool })
    }

    /// Get reference to underlying pool for direct queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Test the database connection
    pub async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the connection pool gracefully
    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Build SQLite connection options from a URL plus tuning knobs
pub struct DbConnectionBuilder {
    url: String,
    busy_timeout: Duration,
    create_if_missing: bool,
}

impl DbConnectionBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            busy_timeout: Duration::from_secs(5),
            create_if_missing: true,
        }
    }

    /// How long a writer waits on a locked database before failing
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn build(self) -> DbResult<SqliteConnectOptions> {
        let opts = SqliteConnectOptions::from_str(&self.url)
            .map_err(|e| DbError::ConfigError(format!("invalid database url '{}': {}", self.url, e)))?
            .create_if_missing(self.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(self.busy_timeout);

        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_builder() {
        let opts = DbConnectionBuilder::new("sqlite://weather.db")
            .busy_timeout(Duration::from_secs(1))
            .create_if_missing(false)
            .build();
        assert!(opts.is_ok());
    }

    #[test]
    fn test_connection_builder_rejects_bad_url() {
        let err = DbConnectionBuilder::new("sqlite://weather.db?mode=bogus")
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, DbError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_in_memory_ping() {
        let client = DbClient::in_memory().await.unwrap();
        client.ping().await.unwrap();
        client.close().await;
    }
}
