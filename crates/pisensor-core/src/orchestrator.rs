//! Transition orchestrator: one status row plus one event per transition.
//!
//! The orchestrator appends facts. It does not look at the sensor's prior
//! state, so it can be shared by the agent (whose state machine decides
//! legality) and by the API (manual and forced transitions).
//!
//! The two writes are sequential, not transactional. If the status insert
//! succeeds and the event append fails, the status row stays and the error
//! carries its `row_id` so the gap can be found later.

use chrono::Utc;
use pisensor_db::{DbError, SensorJournal};
use pisensor_types::{EventRecord, EventType, NewEvent, NewStatus, StatusRecord};

/// A transition whose status row and event were both written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedTransition {
    /// The new status row.
    pub status: StatusRecord,
    /// The matching event.
    pub event: EventRecord,
}

/// A transition that could not be fully persisted.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Nothing was written.
    #[error("failed to write {event_type} status for {sensor_id}: {source}")]
    StatusWrite {
        /// Sensor being transitioned.
        sensor_id: String,
        /// Transition attempted.
        event_type: EventType,
        /// Underlying store error.
        source: DbError,
    },

    /// The status row was written but its event was not.
    #[error("status row {status_row_id} for {sensor_id} has no {event_type} event: {source}")]
    EventWrite {
        /// Sensor being transitioned.
        sensor_id: String,
        /// Transition attempted.
        event_type: EventType,
        /// Row id of the orphaned status row.
        status_row_id: i64,
        /// Underlying store error.
        source: DbError,
    },
}

impl OrchestratorError {
    /// Row id of a status row left without its event, if any.
    pub const fn orphaned_status_row(&self) -> Option<i64> {
        match self {
            Self::StatusWrite { .. } => None,
            Self::EventWrite { status_row_id, .. } => Some(*status_row_id),
        }
    }
}

/// Applies lifecycle transitions through a [`SensorJournal`].
#[derive(Debug, Clone)]
pub struct Orchestrator<J> {
    journal: J,
}

impl<J: SensorJournal> Orchestrator<J> {
    /// Create an orchestrator writing to `journal`.
    pub const fn new(journal: J) -> Self {
        Self { journal }
    }

    /// The underlying journal.
    pub const fn journal(&self) -> &J {
        &self.journal
    }

    /// Record that a sensor entered `Error`.
    pub async fn apply_error_detected(
        &self,
        sensor_id: &str,
        triggered_by: &str,
    ) -> Result<AppliedTransition, OrchestratorError> {
        self.apply(sensor_id, EventType::ErrorDetected, triggered_by).await
    }

    /// Record that a reboot was commanded.
    pub async fn apply_reboot_started(
        &self,
        sensor_id: &str,
        triggered_by: &str,
    ) -> Result<AppliedTransition, OrchestratorError> {
        self.apply(sensor_id, EventType::RebootStarted, triggered_by).await
    }

    /// Record that a sensor is back `Online` after a reboot.
    pub async fn apply_reboot_completed(
        &self,
        sensor_id: &str,
        triggered_by: &str,
    ) -> Result<AppliedTransition, OrchestratorError> {
        self.apply(sensor_id, EventType::RebootCompleted, triggered_by).await
    }

    /// Write the status row implied by `event_type`, then the event.
    pub async fn apply(
        &self,
        sensor_id: &str,
        event_type: EventType,
        triggered_by: &str,
    ) -> Result<AppliedTransition, OrchestratorError> {
        let observed_at = Utc::now();
        let new_status = NewStatus::derived(
            sensor_id,
            event_type.resulting_status(),
            triggered_by,
            observed_at,
        );
        let new_event = NewEvent::derived(sensor_id, event_type, triggered_by, observed_at);

        let status = self
            .journal
            .append_status(&new_status)
            .await
            .map_err(|source| OrchestratorError::StatusWrite {
                sensor_id: sensor_id.to_owned(),
                event_type,
                source,
            })?;

        let event = match self.journal.append_event(&new_event).await {
            Ok(event) => event,
            Err(source) => {
                tracing::error!(
                    sensor_id,
                    %event_type,
                    status_row_id = status.row_id,
                    error = %source,
                    "Status row written without its event"
                );
                return Err(OrchestratorError::EventWrite {
                    sensor_id: sensor_id.to_owned(),
                    event_type,
                    status_row_id: status.row_id,
                    source,
                });
            }
        };

        tracing::info!(
            sensor_id,
            status = %status.status,
            %event_type,
            triggered_by,
            status_row_id = status.row_id,
            event_row_id = event.row_id,
            "Transition recorded"
        );
        Ok(AppliedTransition { status, event })
    }
}
