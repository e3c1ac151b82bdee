//! Shared application state for the sensor API.
//!
//! The API holds no sensor state of its own. Every request reads or
//! appends to the shared store, so the agent and the API agree on the
//! current status without talking to each other.

use std::collections::BTreeSet;

use pisensor_core::Orchestrator;
use pisensor_db::Database;

use crate::error::ApiError;

/// State shared by all handlers.
pub struct AppState {
    /// Shared store.
    pub db: Database,
    /// Writes forced transitions as a status row plus an event.
    pub orchestrator: Orchestrator<Database>,
    /// Sensor ids accepted by write endpoints. Empty accepts any id.
    pub known_sensors: BTreeSet<String>,
}

impl AppState {
    /// Build the state around an open store.
    pub fn new(db: Database, known_sensors: impl IntoIterator<Item = String>) -> Self {
        Self {
            orchestrator: Orchestrator::new(db.clone()),
            db,
            known_sensors: known_sensors.into_iter().collect(),
        }
    }

    /// Reject blank ids, and ids outside the allow-list when one is set.
    pub fn check_sensor(&self, sensor_id: &str) -> Result<(), ApiError> {
        if sensor_id.trim().is_empty() {
            return Err(ApiError::Validation("sensorId must not be blank".to_owned()));
        }
        if !self.known_sensors.is_empty() && !self.known_sensors.contains(sensor_id) {
            return Err(ApiError::Validation(format!("unknown sensor {sensor_id:?}")));
        }
        Ok(())
    }
}

/// Reject a blank actor field.
pub fn check_actor(field: &str, actor: &str) -> Result<(), ApiError> {
    if actor.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}
