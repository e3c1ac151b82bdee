//! Persisted record types for the status table and the event log.
//!
//! `New*` structs describe a row before insertion. The store assigns the
//! row sequence number and the store-side timestamps and hands back the
//! full record. Records serialize in camelCase because they are returned
//! verbatim by the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EventType, IndicatorColor, SensorStatus};
use crate::ids::{EventId, StatusId};

/// One row of the status table.
///
/// The row with the latest `observed_at` for a `sensor_id` is that sensor's
/// current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StatusRecord {
    /// Store-assigned insertion sequence number, used for incremental polling.
    pub row_id: i64,
    /// Opaque identity.
    pub id: StatusId,
    /// Logical sensor name.
    pub sensor_id: String,
    /// Lifecycle status.
    pub status: SensorStatus,
    /// Indicator color at the time of the change.
    pub indicator: IndicatorColor,
    /// Free-text actor that caused the change.
    pub changed_by: String,
    /// When the change was observed.
    pub observed_at: DateTime<Utc>,
    /// When the row was first written.
    pub recorded_at: DateTime<Utc>,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

/// One entry of the append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EventRecord {
    /// Store-assigned insertion sequence number, used for incremental polling.
    pub row_id: i64,
    /// Opaque identity.
    pub id: EventId,
    /// Logical sensor name.
    pub sensor_id: String,
    /// Kind of event.
    pub event_type: EventType,
    /// Status label snapshot at the time of the event.
    pub status: String,
    /// Free-text actor that caused the event.
    pub triggered_by: String,
    /// When the event was observed.
    pub observed_at: DateTime<Utc>,
    /// When the event was written.
    pub recorded_at: DateTime<Utc>,
}

/// A status row that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatus {
    /// Identity to assign.
    pub id: StatusId,
    /// Logical sensor name.
    pub sensor_id: String,
    /// Lifecycle status.
    pub status: SensorStatus,
    /// Indicator color.
    pub indicator: IndicatorColor,
    /// Actor.
    pub changed_by: String,
    /// Observation time.
    pub observed_at: DateTime<Utc>,
}

impl NewStatus {
    /// Build a status row whose indicator is derived from the status.
    pub fn derived(
        sensor_id: &str,
        status: SensorStatus,
        changed_by: &str,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: StatusId::new(),
            sensor_id: sensor_id.to_owned(),
            status,
            indicator: status.indicator(),
            changed_by: changed_by.to_owned(),
            observed_at,
        }
    }
}

/// An event that has not been appended yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// Identity to assign.
    pub id: EventId,
    /// Logical sensor name.
    pub sensor_id: String,
    /// Kind of event.
    pub event_type: EventType,
    /// Status label snapshot.
    pub status: String,
    /// Actor.
    pub triggered_by: String,
    /// Observation time.
    pub observed_at: DateTime<Utc>,
}

impl NewEvent {
    /// Build an event whose status snapshot is the status the event leads to.
    pub fn derived(
        sensor_id: &str,
        event_type: EventType,
        triggered_by: &str,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            sensor_id: sensor_id.to_owned(),
            event_type,
            status: event_type.resulting_status().as_str().to_owned(),
            triggered_by: triggered_by.to_owned(),
            observed_at,
        }
    }
}

/// Filter for listing status rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFilter {
    /// Only rows for this sensor.
    pub sensor_id: Option<String>,
}

/// Filter for listing events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Only events of this type.
    pub event_type: Option<EventType>,
    /// Only events for this sensor.
    pub sensor_id: Option<String>,
}

/// Envelope returned by the incremental poll endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PollResponse<T: TS> {
    /// Records with a row id greater than the requested one, newest first.
    pub data: Vec<T>,
}

impl<T: TS> PollResponse<T> {
    /// Largest row id in this batch, if any. Callers pass it back as
    /// `sinceRowId` on the next poll.
    pub fn max_row_id(&self, row_id: impl Fn(&T) -> i64) -> Option<i64> {
        self.data.iter().map(row_id).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_status_carries_matching_indicator() {
        let row = NewStatus::derived("SENSOR-001", SensorStatus::Error, "button_press", Utc::now());
        assert_eq!(row.indicator, IndicatorColor::Red);
        assert_eq!(row.changed_by, "button_press");
    }

    #[test]
    fn derived_event_snapshots_resulting_status() {
        let event = NewEvent::derived(
            "SENSOR-001",
            EventType::RebootCompleted,
            "worker_auto",
            Utc::now(),
        );
        assert_eq!(event.status, "Online");
    }

    #[test]
    fn status_record_serializes_camel_case() {
        let now = Utc::now();
        let record = StatusRecord {
            row_id: 7,
            id: StatusId::new(),
            sensor_id: "SENSOR-002".to_owned(),
            status: SensorStatus::Rebooting,
            indicator: IndicatorColor::Off,
            changed_by: "user1".to_owned(),
            observed_at: now,
            recorded_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&record).unwrap_or_default();
        assert_eq!(json["rowId"], 7);
        assert_eq!(json["sensorId"], "SENSOR-002");
        assert_eq!(json["status"], "Rebooting");
        assert_eq!(json["changedBy"], "user1");
    }

    #[test]
    fn poll_response_reports_max_row_id() {
        let empty: PollResponse<EventRecord> = PollResponse { data: Vec::new() };
        assert_eq!(empty.max_row_id(|e| e.row_id), None);
    }
}
