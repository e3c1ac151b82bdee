//! Operator command endpoints: forced error and commanded reboot.
//!
//! Both go through the same [`Orchestrator`](pisensor_core::Orchestrator)
//! the agent uses, so each writes one status row and one event. They do
//! not check the sensor's current state. The agent picks the change up on
//! its next poll.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/sensor/error` | Force a sensor into `Error` |
//! | `POST` | `/api/sensor/reboot` | Command a reboot (`Rebooting`) |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use pisensor_types::{EventType, StatusRecord};

use crate::error::ApiError;
use crate::state::{AppState, check_actor};

/// Body for the command endpoints.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    /// Target sensor.
    #[serde(default)]
    pub sensor_id: String,
    /// Operator issuing the command.
    #[serde(default)]
    pub triggered_by: String,
}

async fn command(
    state: &AppState,
    body: CommandRequest,
    event_type: EventType,
) -> Result<(StatusCode, Json<StatusRecord>), ApiError> {
    state.check_sensor(&body.sensor_id)?;
    check_actor("triggeredBy", &body.triggered_by)?;

    let applied = state
        .orchestrator
        .apply(&body.sensor_id, event_type, &body.triggered_by)
        .await?;
    tracing::info!(
        sensor_id = %body.sensor_id,
        triggered_by = %body.triggered_by,
        %event_type,
        status_row_id = applied.status.row_id,
        event_row_id = applied.event.row_id,
        "Command recorded"
    );
    Ok((StatusCode::CREATED, Json(applied.status)))
}

// ---------------------------------------------------------------------------
// POST /api/sensor/error
// ---------------------------------------------------------------------------

/// Force a sensor into `Error`, recording `ErrorDetected`.
pub async fn force_error(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CommandRequest>,
) -> Result<impl IntoResponse, ApiError> {
    command(&state, body, EventType::ErrorDetected).await
}

// ---------------------------------------------------------------------------
// POST /api/sensor/reboot
// ---------------------------------------------------------------------------

/// Command a reboot, recording `RebootStarted`.
pub async fn force_reboot(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CommandRequest>,
) -> Result<impl IntoResponse, ApiError> {
    command(&state, body, EventType::RebootStarted).await
}
