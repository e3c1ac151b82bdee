//! Status table operations.
//!
//! Every lifecycle transition inserts a new row; history is never
//! overwritten except through [`StatusStore::update`], which backs the
//! manual correction endpoint. The current status of a sensor is the row
//! with the latest `observed_at`, ties broken by the larger `row_id`.

use chrono::{DateTime, Utc};
use pisensor_types::{NewStatus, StatusFilter, StatusId, StatusRecord};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::DbError;

/// Columns selected for every status query, in [`StatusRow`] order.
const STATUS_COLUMNS: &str =
    "row_id, id, sensor_id, status, indicator, changed_by, observed_at, recorded_at, updated_at";

/// Operations on the `sensor_status` table.
pub struct StatusStore<'a> {
    pool: &'a SqlitePool,
}

/// Field values written by [`StatusStore::update`].
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    /// New sensor id for the row.
    pub sensor_id: String,
    /// New status.
    pub status: pisensor_types::SensorStatus,
    /// New indicator color.
    pub indicator: pisensor_types::IndicatorColor,
    /// Actor making the correction.
    pub changed_by: String,
    /// Observation time of the correction.
    pub observed_at: DateTime<Utc>,
}

impl<'a> StatusStore<'a> {
    /// Create a new status store bound to a connection pool.
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a status row and return it with its assigned `row_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the insert fails.
    pub async fn insert(&self, status: &NewStatus) -> Result<StatusRecord, DbError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, StatusRow>(&format!(
            "INSERT INTO sensor_status (id, sensor_id, status, indicator, changed_by, observed_at, recorded_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             RETURNING {STATUS_COLUMNS}"
        ))
        .bind(status.id.to_string())
        .bind(&status.sensor_id)
        .bind(status.status.as_str())
        .bind(status.indicator.as_str())
        .bind(&status.changed_by)
        .bind(status.observed_at)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(
            row_id = row.row_id,
            sensor_id = %status.sensor_id,
            status = %status.status,
            "Inserted status row"
        );
        row.try_into()
    }

    /// Look up a status row by its identity.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn get_by_id(&self, id: StatusId) -> Result<Option<StatusRecord>, DbError> {
        let row = sqlx::query_as::<_, StatusRow>(&format!(
            "SELECT {STATUS_COLUMNS} FROM sensor_status WHERE id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(self.pool)
        .await?;

        row.map(StatusRecord::try_from).transpose()
    }

    /// Current status of a sensor, if it has any rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn current(&self, sensor_id: &str) -> Result<Option<StatusRecord>, DbError> {
        let row = sqlx::query_as::<_, StatusRow>(&format!(
            "SELECT {STATUS_COLUMNS} FROM sensor_status
             WHERE sensor_id = ?1
             ORDER BY observed_at DESC, row_id DESC
             LIMIT 1"
        ))
        .bind(sensor_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(StatusRecord::try_from).transpose()
    }

    /// All status rows matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn list(&self, filter: &StatusFilter) -> Result<Vec<StatusRecord>, DbError> {
        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {STATUS_COLUMNS} FROM sensor_status"));
        if let Some(sensor_id) = &filter.sensor_id {
            query.push(" WHERE sensor_id = ").push_bind(sensor_id.as_str());
        }
        query.push(" ORDER BY row_id DESC");

        let rows = query
            .build_query_as::<StatusRow>()
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(StatusRecord::try_from).collect()
    }

    /// Rows inserted after `since_row_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn since(&self, since_row_id: i64) -> Result<Vec<StatusRecord>, DbError> {
        let rows = sqlx::query_as::<_, StatusRow>(&format!(
            "SELECT {STATUS_COLUMNS} FROM sensor_status
             WHERE row_id > ?1
             ORDER BY row_id DESC"
        ))
        .bind(since_row_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(StatusRecord::try_from).collect()
    }

    /// Overwrite the mutable fields of an existing row in place.
    ///
    /// Returns `false` if no row has the given identity.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the update fails.
    pub async fn update(&self, id: StatusId, update: &StatusUpdate) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE sensor_status
             SET sensor_id = ?1,
                 status = ?2,
                 indicator = ?3,
                 changed_by = ?4,
                 observed_at = ?5,
                 updated_at = ?6
             WHERE id = ?7",
        )
        .bind(&update.sensor_id)
        .bind(update.status.as_str())
        .bind(update.indicator.as_str())
        .bind(&update.changed_by)
        .bind(update.observed_at)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(self.pool)
        .await?;

        let updated = result.rows_affected() > 0;
        tracing::debug!(%id, updated, "Updated status row");
        Ok(updated)
    }

    /// Number of status rows, optionally for a single sensor.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the query fails.
    pub async fn count(&self, sensor_id: Option<&str>) -> Result<i64, DbError> {
        let count = match sensor_id {
            Some(id) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM sensor_status WHERE sensor_id = ?1",
                )
                .bind(id)
                .fetch_one(self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sensor_status")
                    .fetch_one(self.pool)
                    .await?
            }
        };
        Ok(count)
    }
}

/// A raw row from the `sensor_status` table.
///
/// Enum and identity columns are stored as text and validated on the way
/// out through [`TryFrom`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusRow {
    /// Insertion sequence number.
    pub row_id: i64,
    /// Identity as text.
    pub id: String,
    /// Logical sensor name.
    pub sensor_id: String,
    /// Status as text.
    pub status: String,
    /// Indicator color as text.
    pub indicator: String,
    /// Actor.
    pub changed_by: String,
    /// Observation time.
    pub observed_at: DateTime<Utc>,
    /// First write time.
    pub recorded_at: DateTime<Utc>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<StatusRow> for StatusRecord {
    type Error = DbError;

    fn try_from(row: StatusRow) -> Result<Self, Self::Error> {
        Ok(Self {
            row_id: row.row_id,
            id: row.id.parse().map_err(|e| DbError::decode("id", e))?,
            sensor_id: row.sensor_id,
            status: row.status.parse().map_err(|e| DbError::decode("status", e))?,
            indicator: row
                .indicator
                .parse()
                .map_err(|e| DbError::decode("indicator", e))?,
            changed_by: row.changed_by,
            observed_at: row.observed_at,
            recorded_at: row.recorded_at,
            updated_at: row.updated_at,
        })
    }
}
