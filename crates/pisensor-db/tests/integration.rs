//! Integration tests for the `pisensor-db` store.
//!
//! Every test opens its own private in-memory `SQLite` database with the
//! migrations applied, so no external services are needed.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::too_many_lines,
    clippy::indexing_slicing
)]

use chrono::{Duration, Utc};
use pisensor_db::{Database, SensorJournal, StatusUpdate};
use pisensor_types::{
    EventFilter, EventType, IndicatorColor, NewEvent, NewStatus, SensorStatus, StatusFilter,
    StatusId,
};

async fn setup() -> Database {
    Database::in_memory()
        .await
        .expect("Failed to open in-memory database")
}

// =============================================================================
// Status table
// =============================================================================

#[tokio::test]
async fn status_insert_assigns_increasing_row_ids() {
    let db = setup().await;
    let now = Utc::now();

    let first = db
        .statuses()
        .insert(&NewStatus::derived("SENSOR-001", SensorStatus::Online, "boot", now))
        .await
        .expect("insert first");
    let second = db
        .statuses()
        .insert(&NewStatus::derived("SENSOR-002", SensorStatus::Error, "button_press", now))
        .await
        .expect("insert second");

    assert!(second.row_id > first.row_id);
    assert_eq!(second.indicator, IndicatorColor::Red);
    assert_eq!(second.changed_by, "button_press");

    let fetched = db
        .statuses()
        .get_by_id(second.id)
        .await
        .expect("get_by_id")
        .expect("row exists");
    assert_eq!(fetched, second);
}

#[tokio::test]
async fn current_status_is_latest_observation() {
    let db = setup().await;
    let t0 = Utc::now();
    let statuses = db.statuses();

    statuses
        .insert(&NewStatus::derived("SENSOR-001", SensorStatus::Online, "boot", t0))
        .await
        .expect("insert online");
    statuses
        .insert(&NewStatus::derived(
            "SENSOR-001",
            SensorStatus::Error,
            "button_press",
            t0 + Duration::seconds(1),
        ))
        .await
        .expect("insert error");
    // A late-arriving row with an older observation time does not win.
    statuses
        .insert(&NewStatus::derived(
            "SENSOR-001",
            SensorStatus::Rebooting,
            "user1",
            t0 - Duration::seconds(10),
        ))
        .await
        .expect("insert stale");

    let current = statuses
        .current("SENSOR-001")
        .await
        .expect("current")
        .expect("sensor has rows");
    assert_eq!(current.status, SensorStatus::Error);

    let missing = statuses.current("SENSOR-404").await.expect("current");
    assert!(missing.is_none());
}

#[tokio::test]
async fn status_since_is_newest_first_and_non_duplicating() {
    let db = setup().await;
    let statuses = db.statuses();
    let now = Utc::now();

    let mut row_ids = Vec::new();
    for status in [SensorStatus::Error, SensorStatus::Rebooting, SensorStatus::Online] {
        let record = statuses
            .insert(&NewStatus::derived("SENSOR-001", status, "test", now))
            .await
            .expect("insert");
        row_ids.push(record.row_id);
    }

    let all = statuses.since(0).await.expect("since 0");
    let ids: Vec<i64> = all.iter().map(|r| r.row_id).collect();
    let mut expected = row_ids.clone();
    expected.reverse();
    assert_eq!(ids, expected);

    // Calling twice with the same cursor is stable.
    let again = statuses.since(0).await.expect("since 0 again");
    assert_eq!(all, again);

    // Advancing the cursor past the first row never returns it again.
    let tail = statuses.since(row_ids[0]).await.expect("since first");
    assert_eq!(tail.len(), 2);
    assert!(tail.iter().all(|r| r.row_id > row_ids[0]));

    let empty = statuses.since(row_ids[2]).await.expect("since last");
    assert!(empty.is_empty());
}

#[tokio::test]
async fn status_update_overwrites_in_place() {
    let db = setup().await;
    let statuses = db.statuses();
    let record = statuses
        .insert(&NewStatus::derived("SENSOR-001", SensorStatus::Error, "button_press", Utc::now()))
        .await
        .expect("insert");

    let updated = statuses
        .update(
            record.id,
            &StatusUpdate {
                sensor_id: "SENSOR-001".to_owned(),
                status: SensorStatus::Online,
                indicator: IndicatorColor::Green,
                changed_by: "operator".to_owned(),
                observed_at: Utc::now(),
            },
        )
        .await
        .expect("update");
    assert!(updated);

    let fetched = statuses
        .get_by_id(record.id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(fetched.row_id, record.row_id);
    assert_eq!(fetched.status, SensorStatus::Online);
    assert_eq!(fetched.changed_by, "operator");
    assert_eq!(fetched.recorded_at, record.recorded_at);
    assert!(fetched.updated_at >= record.updated_at);
    assert_eq!(statuses.count(None).await.expect("count"), 1);

    let absent = statuses
        .update(
            StatusId::new(),
            &StatusUpdate {
                sensor_id: "SENSOR-001".to_owned(),
                status: SensorStatus::Online,
                indicator: IndicatorColor::Green,
                changed_by: "operator".to_owned(),
                observed_at: Utc::now(),
            },
        )
        .await
        .expect("update missing");
    assert!(!absent);
}

#[tokio::test]
async fn status_list_filters_by_sensor() {
    let db = setup().await;
    let now = Utc::now();
    for sensor in ["SENSOR-001", "SENSOR-002", "SENSOR-001"] {
        db.statuses()
            .insert(&NewStatus::derived(sensor, SensorStatus::Online, "boot", now))
            .await
            .expect("insert");
    }

    let all = db.statuses().list(&StatusFilter::default()).await.expect("list");
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].row_id > w[1].row_id));

    let one = db
        .statuses()
        .list(&StatusFilter {
            sensor_id: Some("SENSOR-001".to_owned()),
        })
        .await
        .expect("list filtered");
    assert_eq!(one.len(), 2);
    assert_eq!(db.statuses().count(Some("SENSOR-002")).await.expect("count"), 1);
}

// =============================================================================
// Event log
// =============================================================================

#[tokio::test]
async fn event_append_and_filter() {
    let db = setup().await;
    let now = Utc::now();
    let events = db.events();

    let detected = events
        .append(&NewEvent::derived("SENSOR-001", EventType::ErrorDetected, "button_press", now))
        .await
        .expect("append detected");
    events
        .append(&NewEvent::derived("SENSOR-002", EventType::ErrorDetected, "button_press", now))
        .await
        .expect("append detected 2");
    events
        .append(&NewEvent::derived("SENSOR-001", EventType::RebootStarted, "user1", now))
        .await
        .expect("append started");

    assert_eq!(detected.status, "Error");
    let fetched = events
        .get_by_id(detected.id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(fetched, detected);

    let by_type = events
        .list(&EventFilter {
            event_type: Some(EventType::ErrorDetected),
            sensor_id: None,
        })
        .await
        .expect("list by type");
    assert_eq!(by_type.len(), 2);

    let by_both = events
        .list(&EventFilter {
            event_type: Some(EventType::ErrorDetected),
            sensor_id: Some("SENSOR-001".to_owned()),
        })
        .await
        .expect("list by both");
    assert_eq!(by_both.len(), 1);

    let since = events.since(detected.row_id).await.expect("since");
    assert_eq!(since.len(), 2);
    assert_eq!(since[0].event_type, EventType::RebootStarted);
    assert_eq!(events.count(Some("SENSOR-001")).await.expect("count"), 2);
}

#[tokio::test]
async fn event_log_rejects_update_and_delete() {
    let db = setup().await;
    let event = db
        .events()
        .append(&NewEvent::derived("SENSOR-001", EventType::ErrorDetected, "button_press", Utc::now()))
        .await
        .expect("append");

    let update = sqlx::query("UPDATE sensor_events SET status = 'Online' WHERE row_id = ?1")
        .bind(event.row_id)
        .execute(db.pool())
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM sensor_events")
        .execute(db.pool())
        .await;
    assert!(delete.is_err());
    assert_eq!(db.events().count(None).await.expect("count"), 1);
}

#[tokio::test]
async fn journal_writes_through_database() {
    let db = setup().await;
    let now = Utc::now();

    let status = db
        .append_status(&NewStatus::derived("SENSOR-001", SensorStatus::Error, "button_press", now))
        .await
        .expect("append status");
    let event = db
        .append_event(&NewEvent::derived("SENSOR-001", EventType::ErrorDetected, "button_press", now))
        .await
        .expect("append event");

    assert_eq!(status.status.as_str(), event.status);
    assert!(db.ping().await.is_ok());
}
