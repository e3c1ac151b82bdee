//! Sensor API binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `pisensor-config.yaml`
//! 2. Initialize structured logging
//! 3. Open the shared store and apply migrations
//! 4. Serve until Ctrl-C, then drain in-flight requests

use std::sync::Arc;

use pisensor_api::{AppState, start_server};
use pisensor_core::PiSensorConfig;
use pisensor_core::telemetry::init_logging;
use pisensor_db::{Database, SqliteConfig};
use tracing::info;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the store, or the listener fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PiSensorConfig::load()?;
    init_logging(&config.logging);
    info!(
        host = %config.api.host,
        port = config.api.port,
        database = %config.database.url,
        known_sensors = ?config.api.known_sensors,
        "pisensor-api starting"
    );

    let sqlite = SqliteConfig::new(&config.database.url)
        .with_max_connections(config.database.max_connections)
        .with_connect_timeout(config.database.connect_timeout());
    let db = Database::connect(&sqlite).await?;
    db.run_migrations().await?;

    let state = Arc::new(AppState::new(db.clone(), config.api.known_sensors.clone()));
    start_server(&config.api, state, shutdown_signal()).await?;

    db.close().await;
    info!("pisensor-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, shutting down"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
    }
}
