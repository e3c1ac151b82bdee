//! Error types for the agent binary.
//!
//! [`AgentError`] is the top-level error that `main` propagates. Anything
//! reaching it aborts startup; once the loops run, failures are logged and
//! retried instead.

use pisensor_core::{ConfigError, HardwareError};
use pisensor_db::DbError;

/// Top-level error for the agent binary.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The shared store could not be opened or migrated.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: DbError,
    },

    /// Indicator, input, or buzzer lines could not be set up.
    #[error("hardware error: {source}")]
    Hardware {
        /// The underlying hardware error.
        #[from]
        source: HardwareError,
    },

    /// The HTTP client for remote reads could not be built.
    #[error("remote client error: {message}")]
    Remote {
        /// Description of the failure.
        message: String,
    },
}
