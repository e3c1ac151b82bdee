//! `SQLite` connection pool and schema bootstrap.
//!
//! The agent and the API process open the same database file. WAL journaling
//! and a busy timeout let both write without an external lock; row-level
//! last-write-wins is the only conflict policy.
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time checked)
//! so builds never need a live database. All queries are parameterized.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::DbError;
use crate::event_store::EventStore;
use crate::status_store::StatusStore;

/// Default maximum number of connections in the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default connection timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// How long a writer waits on a locked database before failing.
const BUSY_TIMEOUT_SECS: u64 = 5;

/// Configuration for the `SQLite` connection pool.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// `SQLite` connection URL.
    ///
    /// Format: `sqlite://path/to/sensors.db` or `sqlite::memory:`
    pub url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection acquire timeout.
    pub connect_timeout: Duration,
}

impl SqliteConfig {
    /// Create a new configuration from a database URL.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Whether the URL names a private in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Connection pool handle to the shared sensor database.
///
/// Wraps a [`sqlx::SqlitePool`] and hands out the status and event stores.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the database using the provided configuration.
    ///
    /// The file is created if it does not exist. An in-memory database is
    /// private to a single connection, so the pool is pinned to exactly one
    /// connection that is never recycled.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Sqlite`] if the connection fails.
    pub async fn connect(config: &SqliteConfig) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| DbError::Config(format!("Invalid database URL: {e}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS));

        let pool_options = SqlitePoolOptions::new().acquire_timeout(config.connect_timeout);

        let pool = if config.is_in_memory() {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            pool_options
                .max_connections(config.max_connections)
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await?
        };

        tracing::info!(
            url = %config.url,
            max_connections = config.max_connections,
            "Connected to SQLite"
        );

        Ok(Self { pool })
    }

    /// Connect using a database URL string with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection fails.
    pub async fn connect_url(url: &str) -> Result<Self, DbError> {
        Self::connect(&SqliteConfig::new(url)).await
    }

    /// Open a fresh private in-memory database with the schema applied.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or the migrations fail.
    pub async fn in_memory() -> Result<Self, DbError> {
        let db = Self::connect_url("sqlite::memory:").await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending migrations from the `migrations/` directory.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Migration`] if any migration fails.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations completed");
        Ok(())
    }

    /// Round-trip a trivial query to confirm the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Return a reference to the underlying [`SqlitePool`].
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Operations on the status table.
    pub const fn statuses(&self) -> StatusStore<'_> {
        StatusStore::new(&self.pool)
    }

    /// Operations on the event log.
    pub const fn events(&self) -> EventStore<'_> {
        EventStore::new(&self.pool)
    }

    /// Close all connections in the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("SQLite pool closed");
    }
}
