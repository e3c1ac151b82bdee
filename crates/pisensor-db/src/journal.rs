//! Write seam used by the transition orchestrator.
//!
//! [`SensorJournal`] is the minimal write surface a lifecycle transition
//! needs: one status insert and one event append. [`Database`] is the
//! production implementation; tests substitute journals that fail on
//! demand.

use std::future::Future;

use pisensor_types::{EventRecord, NewEvent, NewStatus, StatusRecord};

use crate::error::DbError;
use crate::sqlite::Database;

/// Append-only writer for status rows and events.
pub trait SensorJournal: Send + Sync {
    /// Insert a status row.
    fn append_status(
        &self,
        status: &NewStatus,
    ) -> impl Future<Output = Result<StatusRecord, DbError>> + Send;

    /// Append an event.
    fn append_event(
        &self,
        event: &NewEvent,
    ) -> impl Future<Output = Result<EventRecord, DbError>> + Send;
}

impl SensorJournal for Database {
    async fn append_status(&self, status: &NewStatus) -> Result<StatusRecord, DbError> {
        self.statuses().insert(status).await
    }

    async fn append_event(&self, event: &NewEvent) -> Result<EventRecord, DbError> {
        self.events().append(event).await
    }
}
