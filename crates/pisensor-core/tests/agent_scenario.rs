//! End-to-end agent scenarios against an in-memory store.
//!
//! The indicator and ambient pattern are recording fakes and input lines
//! are scripted, so these tests exercise the real state machine,
//! orchestrator, poller, and store together.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use pisensor_core::config::{AgentConfig, SensorBinding};
use pisensor_core::{
    AmbientPattern, HardwareError, Indicator, InputLines, Outputs, PollOutcome, SensorAgent,
    Trigger, TriggerOutcome,
};
use pisensor_db::{Database, DbError, SensorJournal};
use pisensor_types::{
    EventFilter, EventRecord, EventType, IndicatorColor, NewEvent, NewStatus, SensorStatus,
    StatusRecord,
};
use tokio::sync::watch;

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct Recorder(Mutex<Vec<String>>);

impl Recorder {
    fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    fn last(&self) -> Option<String> {
        self.0.lock().unwrap().last().cloned()
    }
}

impl Indicator for Recorder {
    fn set_normal(&self) -> Result<(), HardwareError> {
        self.push("normal");
        Ok(())
    }

    fn set_error_for_sensor(&self, sensor_id: &str) -> Result<(), HardwareError> {
        self.push(format!("error:{sensor_id}"));
        Ok(())
    }

    fn off(&self) -> Result<(), HardwareError> {
        self.push("off");
        Ok(())
    }
}

impl AmbientPattern for Recorder {
    fn start(&self) {
        self.push("ambient:start");
    }

    fn stop(&self) {
        self.push("ambient:stop");
    }

    fn chime(&self) {
        self.push("ambient:chime");
    }
}

/// Input lines whose levels the test sets directly. Unset pins read high.
#[derive(Default)]
struct ScriptedInputs(Mutex<HashMap<u32, bool>>);

impl ScriptedInputs {
    fn set(&self, pin: u32, high: bool) {
        self.0.lock().unwrap().insert(pin, high);
    }
}

impl InputLines for ScriptedInputs {
    fn read_level(&self, pin: u32) -> Result<bool, HardwareError> {
        Ok(self.0.lock().unwrap().get(&pin).copied().unwrap_or(true))
    }
}

/// Journal that forwards to the store unless told to fail status writes.
struct SwitchableJournal {
    db: Database,
    failing: Arc<AtomicBool>,
}

impl SensorJournal for SwitchableJournal {
    async fn append_status(&self, status: &NewStatus) -> Result<StatusRecord, DbError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DbError::Config("store offline".to_owned()));
        }
        self.db.append_status(status).await
    }

    async fn append_event(&self, event: &NewEvent) -> Result<EventRecord, DbError> {
        self.db.append_event(event).await
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn agent_config() -> AgentConfig {
    AgentConfig {
        sensors: vec![
            SensorBinding {
                id: "SENSOR-001".to_owned(),
                pin: 23,
            },
            SensorBinding {
                id: "SENSOR-002".to_owned(),
                pin: 24,
            },
        ],
        sample_interval_ms: 5,
        debounce_samples: 2,
        poll_interval_ms: 20,
        remote_timeout_ms: 1_000,
        ..AgentConfig::default()
    }
}

fn outputs(recorder: &Arc<Recorder>) -> Outputs {
    Outputs::new(recorder.clone(), recorder.clone())
}

async fn setup() -> (Database, Arc<Recorder>, SensorAgent<Database, Database>) {
    let db = Database::in_memory().await.expect("in-memory store");
    let recorder = Arc::new(Recorder::default());
    let agent = SensorAgent::new(agent_config(), db.clone(), db.clone(), outputs(&recorder));
    agent.hydrate().await;
    (db, recorder, agent)
}

async fn current(db: &Database, sensor_id: &str) -> StatusRecord {
    db.statuses()
        .current(sensor_id)
        .await
        .expect("current status")
        .expect("sensor has a status")
}

async fn events_of(db: &Database, sensor_id: &str) -> Vec<EventRecord> {
    db.events()
        .list(&EventFilter {
            event_type: None,
            sensor_id: Some(sensor_id.to_owned()),
        })
        .await
        .expect("list events")
}

/// An operator writes a status row directly (manual create path).
async fn operator_sets(db: &Database, sensor_id: &str, status: SensorStatus) {
    db.statuses()
        .insert(&NewStatus::derived(sensor_id, status, "user1", Utc::now()))
        .await
        .expect("operator insert");
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn press_then_remote_reboot_then_completion() {
    let (db, recorder, agent) = setup().await;
    assert_eq!(recorder.calls(), vec!["normal", "ambient:start"]);

    // Button press: Online -> Error.
    assert_eq!(
        agent.handle_press("SENSOR-001").await,
        TriggerOutcome::Applied(SensorStatus::Error)
    );
    let status = current(&db, "SENSOR-001").await;
    assert_eq!(status.status, SensorStatus::Error);
    assert_eq!(status.indicator, IndicatorColor::Red);
    assert_eq!(status.changed_by, "button_press");
    let events = events_of(&db, "SENSOR-001").await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::ErrorDetected);
    assert_eq!(recorder.last().as_deref(), Some("error:SENSOR-001"));

    // Nothing changed remotely yet.
    assert_eq!(
        agent.poll_sensor("SENSOR-001").await,
        PollOutcome::Unchanged(SensorStatus::Error)
    );

    // Someone else moves the sensor to Rebooting.
    operator_sets(&db, "SENSOR-001", SensorStatus::Rebooting).await;
    assert_eq!(
        agent.poll_sensor("SENSOR-001").await,
        PollOutcome::Trigger(Trigger::RemoteReboot)
    );

    let status = current(&db, "SENSOR-001").await;
    assert_eq!(status.status, SensorStatus::Online);
    assert_eq!(status.indicator, IndicatorColor::Green);
    assert_eq!(status.changed_by, "worker_auto");

    let events = events_of(&db, "SENSOR-001").await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, EventType::RebootCompleted);
    assert_eq!(events[0].triggered_by, "worker_auto");

    assert_eq!(
        agent.machine().state("SENSOR-001").await,
        Some(SensorStatus::Online)
    );
    let calls = recorder.calls();
    assert!(calls.contains(&"ambient:chime".to_owned()));
    assert_eq!(recorder.last().as_deref(), Some("ambient:start"));

    // A further poll sees the agent's own write and does nothing.
    assert_eq!(
        agent.poll_sensor("SENSOR-001").await,
        PollOutcome::Unchanged(SensorStatus::Online)
    );
    assert_eq!(events_of(&db, "SENSOR-001").await.len(), 2);
}

#[tokio::test]
async fn repeated_presses_while_in_error_record_one_event() {
    let (db, _recorder, agent) = setup().await;

    assert_eq!(
        agent.handle_press("SENSOR-001").await,
        TriggerOutcome::Applied(SensorStatus::Error)
    );
    for _ in 0..5 {
        assert_eq!(
            agent.handle_press("SENSOR-001").await,
            TriggerOutcome::Ignored(SensorStatus::Error)
        );
    }

    let detected = db
        .events()
        .list(&EventFilter {
            event_type: Some(EventType::ErrorDetected),
            sensor_id: Some("SENSOR-001".to_owned()),
        })
        .await
        .unwrap();
    assert_eq!(detected.len(), 1);
    assert_eq!(db.statuses().count(Some("SENSOR-001")).await.unwrap(), 1);
}

#[tokio::test]
async fn failed_write_reverts_and_next_press_retries() {
    let db = Database::in_memory().await.unwrap();
    let recorder = Arc::new(Recorder::default());
    let failing = Arc::new(AtomicBool::new(true));
    let journal = SwitchableJournal {
        db: db.clone(),
        failing: Arc::clone(&failing),
    };
    let agent = SensorAgent::new(agent_config(), journal, db.clone(), outputs(&recorder));
    agent.hydrate().await;

    assert_eq!(agent.handle_press("SENSOR-001").await, TriggerOutcome::Failed);
    assert_eq!(
        agent.machine().state("SENSOR-001").await,
        Some(SensorStatus::Online)
    );
    assert!(!agent.machine().is_busy("SENSOR-001").await);
    assert_eq!(db.events().count(None).await.unwrap(), 0);
    assert_eq!(recorder.last().as_deref(), Some("ambient:start"));

    // Store back: the next press goes through.
    failing.store(false, Ordering::SeqCst);
    assert_eq!(
        agent.handle_press("SENSOR-001").await,
        TriggerOutcome::Applied(SensorStatus::Error)
    );
    assert_eq!(db.events().count(None).await.unwrap(), 1);
    assert_eq!(recorder.last().as_deref(), Some("error:SENSOR-001"));
}

#[tokio::test]
async fn remote_error_is_adopted_without_a_write() {
    let (db, recorder, agent) = setup().await;

    operator_sets(&db, "SENSOR-002", SensorStatus::Error).await;
    assert_eq!(
        agent.poll_sensor("SENSOR-002").await,
        PollOutcome::Trigger(Trigger::RemoteError)
    );
    assert_eq!(
        agent.machine().state("SENSOR-002").await,
        Some(SensorStatus::Error)
    );
    assert_eq!(db.events().count(None).await.unwrap(), 0);
    assert_eq!(db.statuses().count(None).await.unwrap(), 1);
    assert_eq!(recorder.last().as_deref(), Some("error:SENSOR-002"));

    // A local press on the errored sensor is now a duplicate.
    assert_eq!(
        agent.handle_press("SENSOR-002").await,
        TriggerOutcome::Ignored(SensorStatus::Error)
    );
}

#[tokio::test]
async fn hydration_restores_stored_state() {
    let db = Database::in_memory().await.unwrap();
    operator_sets(&db, "SENSOR-001", SensorStatus::Error).await;
    operator_sets(&db, "SENSOR-002", SensorStatus::Rebooting).await;

    let recorder = Arc::new(Recorder::default());
    let agent = SensorAgent::new(agent_config(), db.clone(), db.clone(), outputs(&recorder));
    agent.hydrate().await;

    assert_eq!(
        agent.machine().state("SENSOR-001").await,
        Some(SensorStatus::Error)
    );
    assert_eq!(
        agent.machine().state("SENSOR-002").await,
        Some(SensorStatus::Rebooting)
    );

    // The pending reboot is completed on the next poll.
    agent.poll_once().await;
    assert_eq!(current(&db, "SENSOR-002").await.status, SensorStatus::Online);
    assert_eq!(current(&db, "SENSOR-001").await.status, SensorStatus::Error);
    assert_eq!(recorder.last().as_deref(), Some("error:SENSOR-001"));
}

#[tokio::test]
async fn run_loop_detects_press_and_resets_outputs_on_shutdown() {
    let db = Database::in_memory().await.unwrap();
    let recorder = Arc::new(Recorder::default());
    let agent = SensorAgent::new(agent_config(), db.clone(), db.clone(), outputs(&recorder));
    let inputs = ScriptedInputs::default();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let driver = async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        inputs.set(23, false);

        let mut seen = None;
        for _ in 0..200 {
            seen = db.statuses().current("SENSOR-001").await.unwrap();
            if seen.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        inputs.set(23, true);
        shutdown_tx.send(true).unwrap();
        seen
    };

    let ((), seen) = tokio::join!(agent.run(&inputs, shutdown_rx), driver);

    let seen = seen.expect("press was recorded");
    assert_eq!(seen.status, SensorStatus::Error);
    assert_eq!(db.events().count(Some("SENSOR-001")).await.unwrap(), 1);
    assert_eq!(recorder.last().as_deref(), Some("off"));
    assert!(recorder.calls().contains(&"ambient:stop".to_owned()));
}
