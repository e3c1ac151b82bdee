//! REST endpoint handlers for the status table, the event log, and health.
//!
//! Enum fields arrive as plain strings and are parsed here, so a bad value
//! is a 400 with a message naming the field rather than a body rejection.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness plus store reachability |
//! | `GET` | `/api/sensor/status` | List status rows, newest first |
//! | `POST` | `/api/sensor/status` | Insert a status row manually |
//! | `GET` | `/api/sensor/status/{id}` | Single status row |
//! | `PUT` | `/api/sensor/status/{id}` | Correct a status row in place |
//! | `GET` | `/api/sensor/status/current/{sensorId}` | Current status of a sensor |
//! | `GET` | `/api/trigger/sensor/status/poll` | Status rows after `sinceRowId` |
//! | `GET` | `/api/sensor/events` | List events, newest first |
//! | `POST` | `/api/sensor/events` | Append an event manually |
//! | `GET` | `/api/sensor/events/{id}` | Single event |
//! | `GET` | `/api/sensor/events/poll` | Events after `sinceRowId` |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use pisensor_db::StatusUpdate;
use pisensor_types::{
    EventFilter, EventId, EventType, IndicatorColor, NewEvent, NewStatus, PollResponse,
    SensorStatus, StatusFilter, StatusId,
};

use crate::error::ApiError;
use crate::state::{AppState, check_actor};

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/sensor/status`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    /// Only rows for this sensor.
    pub sensor_id: Option<String>,
}

/// Query parameters for `GET /api/sensor/events`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    /// Only events of this type (`ErrorDetected`, `RebootStarted`,
    /// `RebootCompleted`).
    pub event_type: Option<String>,
    /// Only events for this sensor.
    pub sensor_id: Option<String>,
}

/// Query parameters for the incremental poll endpoints.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollQuery {
    /// Return rows with a larger row id. Defaults to 0 (everything).
    #[serde(default)]
    pub since_row_id: i64,
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body for `POST /api/sensor/status` and `PUT /api/sensor/status/{id}`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBody {
    /// Sensor the row is for.
    #[serde(default)]
    pub sensor_id: String,
    /// `Online`, `Error`, or `Rebooting`.
    #[serde(default)]
    pub status: String,
    /// Indicator color. Derived from the status when omitted.
    pub indicator: Option<String>,
    /// Actor making the change.
    #[serde(default)]
    pub changed_by: String,
    /// Observation time. Defaults to now.
    pub observed_at: Option<DateTime<Utc>>,
}

/// Body for `POST /api/sensor/events`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    /// Sensor the event is for.
    #[serde(default)]
    pub sensor_id: String,
    /// Kind of event.
    #[serde(default)]
    pub event_type: String,
    /// Status label snapshot. Defaults to the status the event leads to.
    pub status: Option<String>,
    /// Actor.
    #[serde(default)]
    pub triggered_by: String,
    /// Observation time. Defaults to now.
    pub observed_at: Option<DateTime<Utc>>,
}

/// A [`StatusBody`] whose fields have been checked.
struct ValidStatus {
    sensor_id: String,
    status: SensorStatus,
    indicator: IndicatorColor,
    changed_by: String,
    observed_at: DateTime<Utc>,
}

impl StatusBody {
    fn validate(self, state: &AppState) -> Result<ValidStatus, ApiError> {
        state.check_sensor(&self.sensor_id)?;
        check_actor("changedBy", &self.changed_by)?;
        let status: SensorStatus = self.status.parse()?;
        let indicator = match self.indicator.as_deref() {
            Some(color) => color.parse()?,
            None => status.indicator(),
        };
        Ok(ValidStatus {
            sensor_id: self.sensor_id,
            status,
            indicator,
            changed_by: self.changed_by,
            observed_at: self.observed_at.unwrap_or_else(Utc::now),
        })
    }
}

fn parse_status_id(s: &str) -> Result<StatusId, ApiError> {
    s.parse()
        .map_err(|e| ApiError::Validation(format!("invalid status id {s:?}: {e}")))
}

fn parse_event_id(s: &str) -> Result<EventId, ApiError> {
    s.parse()
        .map_err(|e| ApiError::Validation(format!("invalid event id {s:?}: {e}")))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report liveness and whether the store answers.
pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .ping()
        .await
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

// ---------------------------------------------------------------------------
// Status rows
// ---------------------------------------------------------------------------

/// List status rows, newest first.
pub async fn list_statuses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = StatusFilter {
        sensor_id: query.sensor_id,
    };
    let records = state.db.statuses().list(&filter).await?;
    Ok(Json(records))
}

/// Insert a status row without an event.
pub async fn create_status(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StatusBody>,
) -> Result<impl IntoResponse, ApiError> {
    let valid = body.validate(&state)?;
    let new_status = NewStatus {
        id: StatusId::new(),
        sensor_id: valid.sensor_id,
        status: valid.status,
        indicator: valid.indicator,
        changed_by: valid.changed_by,
        observed_at: valid.observed_at,
    };
    let record = state.db.statuses().insert(&new_status).await?;
    tracing::info!(
        sensor_id = %record.sensor_id,
        row_id = record.row_id,
        status = %record.status,
        changed_by = %record.changed_by,
        "Status row created"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// Fetch one status row by id.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_status_id(&id)?;
    let record = state
        .db
        .statuses()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("status {id}")))?;
    Ok(Json(record))
}

/// Overwrite the fields of one status row.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_status_id(&id)?;
    let valid = body.validate(&state)?;
    let update = StatusUpdate {
        sensor_id: valid.sensor_id,
        status: valid.status,
        indicator: valid.indicator,
        changed_by: valid.changed_by,
        observed_at: valid.observed_at,
    };
    if !state.db.statuses().update(id, &update).await? {
        return Err(ApiError::NotFound(format!("status {id}")));
    }
    tracing::info!(%id, sensor_id = %update.sensor_id, status = %update.status, "Status row updated");
    Ok(StatusCode::NO_CONTENT)
}

/// Current status of one sensor.
pub async fn current_status(
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .db
        .statuses()
        .current(&sensor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no status for sensor {sensor_id}")))?;
    Ok(Json(record))
}

/// Status rows inserted after `sinceRowId`, newest first.
pub async fn poll_statuses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PollQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state.db.statuses().since(query.since_row_id).await?;
    Ok(Json(PollResponse { data }))
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// List events, newest first.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let event_type = query
        .event_type
        .as_deref()
        .map(str::parse::<EventType>)
        .transpose()?;
    let filter = EventFilter {
        event_type,
        sensor_id: query.sensor_id,
    };
    let records = state.db.events().list(&filter).await?;
    Ok(Json(records))
}

/// Append an event without touching the status table.
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EventBody>,
) -> Result<impl IntoResponse, ApiError> {
    state.check_sensor(&body.sensor_id)?;
    check_actor("triggeredBy", &body.triggered_by)?;
    let event_type: EventType = body.event_type.parse()?;
    let observed_at = body.observed_at.unwrap_or_else(Utc::now);

    let mut new_event =
        NewEvent::derived(&body.sensor_id, event_type, &body.triggered_by, observed_at);
    if let Some(label) = body.status.as_deref() {
        let status: SensorStatus = label.parse()?;
        status.as_str().clone_into(&mut new_event.status);
    }

    let record = state.db.events().append(&new_event).await?;
    tracing::info!(
        sensor_id = %record.sensor_id,
        row_id = record.row_id,
        event_type = %record.event_type,
        triggered_by = %record.triggered_by,
        "Event appended"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// Fetch one event by id.
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_event_id(&id)?;
    let record = state
        .db
        .events()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("event {id}")))?;
    Ok(Json(record))
}

/// Events appended after `sinceRowId`, newest first.
pub async fn poll_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PollQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state.db.events().since(query.since_row_id).await?;
    Ok(Json(PollResponse { data }))
}
