//! Sensor agent binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `pisensor-config.yaml`
//! 2. Initialize structured logging
//! 3. Open the shared store and apply migrations
//! 4. Open GPIO lines (fatal on failure)
//! 5. Choose the remote status transport
//! 6. Hydrate state and run the loops until Ctrl-C
//! 7. Reset outputs and close the store

use pisensor_agent::gpio::open_backend;
use pisensor_agent::{AgentError, Hardware, HttpStatusSource, RemoteSource};
use pisensor_core::telemetry::init_logging;
use pisensor_core::{PiSensorConfig, SensorAgent};
use pisensor_db::{Database, SqliteConfig};
use tokio::sync::watch;
use tracing::info;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the store, the GPIO lines, or the
/// HTTP client cannot be set up.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1-2. Configuration and logging.
    let config = PiSensorConfig::load().map_err(AgentError::from)?;
    init_logging(&config.logging);
    let agent_config = config.agent.clone();
    info!(
        sensors = ?agent_config.sensor_ids(),
        gpio = ?agent_config.gpio.backend,
        remote_url = ?agent_config.remote_url,
        poll_interval_ms = agent_config.poll_interval_ms,
        "pisensor-agent starting"
    );

    // 3. Shared store.
    let sqlite = SqliteConfig::new(&config.database.url)
        .with_max_connections(config.database.max_connections)
        .with_connect_timeout(config.database.connect_timeout());
    let db = Database::connect(&sqlite).await.map_err(AgentError::from)?;
    db.run_migrations().await.map_err(AgentError::from)?;

    // 4. Hardware.
    let gpio = open_backend(&agent_config.gpio);
    let hardware = Hardware::open(&gpio, &agent_config).map_err(AgentError::from)?;

    // 5. Remote transport.
    let remote = match agent_config.remote_url.as_deref() {
        Some(url) => {
            let http = HttpStatusSource::new(url, agent_config.remote_timeout()).map_err(|e| {
                AgentError::Remote {
                    message: e.to_string(),
                }
            })?;
            info!(url = http.base_url(), "Polling remote status over HTTP");
            RemoteSource::Http(http)
        }
        None => {
            info!("Polling remote status from the shared store");
            RemoteSource::Store(db.clone())
        }
    };

    // 6. Run until Ctrl-C.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
        }
        let _ = shutdown_tx.send(true);
    });

    let agent = SensorAgent::new(agent_config, db.clone(), remote, hardware.outputs);
    agent.run(&hardware.buttons, shutdown_rx).await;

    // 7. Outputs were reset by the agent on the way out.
    db.close().await;
    info!("pisensor-agent stopped");
    Ok(())
}
