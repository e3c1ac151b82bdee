//! Event log operations.
//!
//! The `sensor_events` table is append-only: the schema installs triggers
//! that abort any `UPDATE` or `DELETE`, so this store only exposes inserts
//! and reads.

use chrono::{DateTime, Utc};
use pisensor_types::{EventFilter, EventId, EventRecord, NewEvent};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::DbError;

/// Columns selected for every event query, in [`EventRow`] order.
const EVENT_COLUMNS: &str =
    "row_id, id, sensor_id, event_type, status, triggered_by, observed_at, recorded_at";

/// Operations on the `sensor_events` table.
pub struct EventStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> EventStore<'a> {
    /// Create a new event store bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Append an event and return it with its assigned `row_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the insert fails.
    pub async fn append(&self, event: &NewEvent) -> Result<EventRecord, DbError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "INSERT INTO sensor_events (id, sensor_id, event_type, status, triggered_by, observed_at, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(event.id.to_string())
        .bind(&event.sensor_id)
        .bind(event.event_type.as_str())
        .bind(&event.status)
        .bind(&event.triggered_by)
        .bind(event.observed_at)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(
            row_id = row.row_id,
            sensor_id = %event.sensor_id,
            event_type = %event.event_type,
            "Appended event"
        );
        row.try_into()
    }

    /// Look up an event by its identity.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn get_by_id(&self, id: EventId) -> Result<Option<EventRecord>, DbError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM sensor_events WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await?;

        row.map(EventRecord::try_from).transpose()
    }

    /// All events matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn list(&self, filter: &EventFilter) -> Result<Vec<EventRecord>, DbError> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM sensor_events WHERE 1 = 1"));
        if let Some(event_type) = filter.event_type {
            query.push(" AND event_type = ").push_bind(event_type.as_str());
        }
        if let Some(sensor_id) = &filter.sensor_id {
            query.push(" AND sensor_id = ").push_bind(sensor_id.as_str());
        }
        query.push(" ORDER BY row_id DESC");

        let rows = query
            .build_query_as::<EventRow>()
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(EventRecord::try_from).collect()
    }

    /// Events appended after `since_row_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn since(&self, since_row_id: i64) -> Result<Vec<EventRecord>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM sensor_events
             WHERE row_id > ?1
             ORDER BY row_id DESC"
        ))
        .bind(since_row_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(EventRecord::try_from).collect()
    }

    /// Number of events, optionally for a single sensor.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn count(&self, sensor_id: Option<&str>) -> Result<i64, DbError> {
        let count = match sensor_id {
            Some(id) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM sensor_events WHERE sensor_id = ?1",
                )
                .bind(id)
                .fetch_one(self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sensor_events")
                    .fetch_one(self.pool)
                    .await?
            }
        };
        Ok(count)
    }
}

/// A raw row from the `sensor_events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Insertion sequence number.
    pub row_id: i64,
    /// Identity as text.
    pub id: String,
    /// Logical sensor name.
    pub sensor_id: String,
    /// Event type as text.
    pub event_type: String,
    /// Status label snapshot.
    pub status: String,
    /// Actor.
    pub triggered_by: String,
    /// Observation time.
    pub observed_at: DateTime<Utc>,
    /// Write time.
    pub recorded_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for EventRecord {
    type Error = DbError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            row_id: row.row_id,
            id: row.id.parse().map_err(|e| DbError::decode("id", e))?,
            sensor_id: row.sensor_id,
            event_type: row
                .event_type
                .parse()
                .map_err(|e| DbError::decode("event_type", e))?,
            status: row.status,
            triggered_by: row.triggered_by,
            observed_at: row.observed_at,
            recorded_at: row.recorded_at,
        })
    }
}
