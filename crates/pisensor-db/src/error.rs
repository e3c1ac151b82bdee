//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors with context about which operation failed.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    /// A schema migration failed.
    #[error("SQLite migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be mapped back onto a domain type.
    #[error("decode error in {column}: {message}")]
    Decode {
        /// Column holding the bad value.
        column: &'static str,
        /// What went wrong.
        message: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    pub(crate) fn decode(column: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            column,
            message: err.to_string(),
        }
    }
}
