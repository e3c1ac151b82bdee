//! Per-sensor lifecycle state machine.
//!
//! Legal transitions:
//!
//! ```text
//! Online    --ButtonPress-----> Error       (recorded: ErrorDetected)
//! Online    --RemoteError-----> Error       (adopted, nothing recorded)
//! Error     --RemoteReboot----> Rebooting   (adopted, nothing recorded)
//! Rebooting --RebootCompleted-> Online      (recorded: RebootCompleted)
//! ```
//!
//! Any other `(state, trigger)` pair is ignored, which makes duplicate
//! triggers harmless: a second press while in `Error` does nothing.
//!
//! Each sensor owns an entry behind its own lock, holding the current
//! state, a busy flag, and the last remote status the agent knows about.
//! A transition is admitted with [`StateMachine::begin`], which marks the
//! sensor busy, and settled with [`StateMachine::commit`] or
//! [`StateMachine::revert`]. While busy, every new trigger for that sensor
//! is refused; other sensors are unaffected.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use pisensor_types::{ACTOR_BUTTON_PRESS, ACTOR_WORKER_AUTO, EventType, SensorStatus};
use tokio::sync::Mutex;

/// Something that may move a sensor to a new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// A debounced press on the sensor's input line.
    ButtonPress,
    /// The store shows `Error` written by another process.
    RemoteError,
    /// The store shows `Rebooting` written by another process.
    RemoteReboot,
    /// The agent has handled a reboot command.
    RebootCompleted,
}

impl Trigger {
    /// Event the agent records for this trigger, with its actor. Adopted
    /// remote changes are already recorded by whoever made them.
    pub const fn recorded_event(self) -> Option<(EventType, &'static str)> {
        match self {
            Self::ButtonPress => Some((EventType::ErrorDetected, ACTOR_BUTTON_PRESS)),
            Self::RebootCompleted => Some((EventType::RebootCompleted, ACTOR_WORKER_AUTO)),
            Self::RemoteError | Self::RemoteReboot => None,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ButtonPress => "button_press",
            Self::RemoteError => "remote_error",
            Self::RemoteReboot => "remote_reboot",
            Self::RebootCompleted => "reboot_completed",
        };
        f.write_str(name)
    }
}

/// State reached from `from` on `trigger`, or `None` if the pair is not a
/// legal transition.
pub const fn next_state(from: SensorStatus, trigger: Trigger) -> Option<SensorStatus> {
    match (from, trigger) {
        (SensorStatus::Online, Trigger::ButtonPress | Trigger::RemoteError) => {
            Some(SensorStatus::Error)
        }
        (SensorStatus::Error, Trigger::RemoteReboot) => Some(SensorStatus::Rebooting),
        (SensorStatus::Rebooting, Trigger::RebootCompleted) => Some(SensorStatus::Online),
        _ => None,
    }
}

/// An admitted, not yet settled, transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Sensor being transitioned.
    pub sensor_id: String,
    /// State before the transition.
    pub from: SensorStatus,
    /// State after the transition.
    pub to: SensorStatus,
    /// What caused it.
    pub trigger: Trigger,
}

/// Result of asking the machine to start a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The transition may proceed; the sensor is now busy.
    Started(Transition),
    /// Another transition for this sensor is in flight.
    Busy,
    /// The trigger is not legal in the sensor's current state.
    Ignored(SensorStatus),
    /// The sensor is not managed by this machine.
    UnknownSensor,
}

#[derive(Debug, Clone)]
struct SensorEntry {
    state: SensorStatus,
    busy: bool,
    last_remote: Option<SensorStatus>,
}

impl SensorEntry {
    const fn new() -> Self {
        Self {
            state: SensorStatus::Online,
            busy: false,
            last_remote: None,
        }
    }
}

/// Lifecycle state for a fixed set of sensors.
#[derive(Debug, Default)]
pub struct StateMachine {
    entries: HashMap<String, Arc<Mutex<SensorEntry>>>,
}

impl StateMachine {
    /// Create a machine for the given sensors, all starting `Online`.
    pub fn new<I, S>(sensor_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = sensor_ids
            .into_iter()
            .map(|id| (id.into(), Arc::new(Mutex::new(SensorEntry::new()))))
            .collect();
        Self { entries }
    }

    fn entry(&self, sensor_id: &str) -> Option<&Arc<Mutex<SensorEntry>>> {
        self.entries.get(sensor_id)
    }

    /// Sensor ids managed by this machine, sorted.
    pub fn sensor_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Seed a sensor's state from the store at startup. Also records the
    /// stored status as the last known remote status.
    pub async fn hydrate(&self, sensor_id: &str, status: SensorStatus) -> bool {
        let Some(entry) = self.entry(sensor_id) else {
            return false;
        };
        let mut entry = entry.lock().await;
        entry.state = status;
        entry.last_remote = Some(status);
        true
    }

    /// Current state of a sensor.
    pub async fn state(&self, sensor_id: &str) -> Option<SensorStatus> {
        let entry = self.entry(sensor_id)?;
        Some(entry.lock().await.state)
    }

    /// Whether a transition for the sensor is in flight.
    pub async fn is_busy(&self, sensor_id: &str) -> bool {
        match self.entry(sensor_id) {
            Some(entry) => entry.lock().await.busy,
            None => false,
        }
    }

    /// Try to start a transition for `trigger`.
    pub async fn begin(&self, sensor_id: &str, trigger: Trigger) -> Admission {
        let Some(entry) = self.entry(sensor_id) else {
            return Admission::UnknownSensor;
        };
        let mut entry = entry.lock().await;
        if entry.busy {
            return Admission::Busy;
        }
        match next_state(entry.state, trigger) {
            Some(to) => {
                entry.busy = true;
                Admission::Started(Transition {
                    sensor_id: sensor_id.to_owned(),
                    from: entry.state,
                    to,
                    trigger,
                })
            }
            None => Admission::Ignored(entry.state),
        }
    }

    /// Settle a transition as done. The target state also becomes the last
    /// known remote status, since the store now holds it.
    pub async fn commit(&self, transition: &Transition) {
        if let Some(entry) = self.entry(&transition.sensor_id) {
            let mut entry = entry.lock().await;
            entry.state = transition.to;
            entry.last_remote = Some(transition.to);
            entry.busy = false;
        }
    }

    /// Settle a transition as failed, leaving the sensor in its prior state
    /// so the next trigger can retry.
    pub async fn revert(&self, transition: &Transition) {
        if let Some(entry) = self.entry(&transition.sensor_id) {
            let mut entry = entry.lock().await;
            entry.state = transition.from;
            entry.busy = false;
        }
    }

    /// Record a fresh remote read and return the previously known remote
    /// status.
    pub async fn observe_remote(
        &self,
        sensor_id: &str,
        remote: SensorStatus,
    ) -> Option<SensorStatus> {
        let entry = self.entry(sensor_id)?;
        entry.lock().await.last_remote.replace(remote)
    }

    /// States of every sensor.
    pub async fn snapshot(&self) -> BTreeMap<String, SensorStatus> {
        let mut states = BTreeMap::new();
        for (id, entry) in &self.entries {
            states.insert(id.clone(), entry.lock().await.state);
        }
        states
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn transition_table() {
        use SensorStatus::{Error, Online, Rebooting};
        use Trigger::{ButtonPress, RebootCompleted, RemoteError, RemoteReboot};

        assert_eq!(next_state(Online, ButtonPress), Some(Error));
        assert_eq!(next_state(Online, RemoteError), Some(Error));
        assert_eq!(next_state(Error, RemoteReboot), Some(Rebooting));
        assert_eq!(next_state(Rebooting, RebootCompleted), Some(Online));

        assert_eq!(next_state(Error, ButtonPress), None);
        assert_eq!(next_state(Error, RemoteError), None);
        assert_eq!(next_state(Online, RemoteReboot), None);
        assert_eq!(next_state(Online, RebootCompleted), None);
        assert_eq!(next_state(Rebooting, ButtonPress), None);
    }

    #[test]
    fn only_local_triggers_are_recorded() {
        assert_eq!(
            Trigger::ButtonPress.recorded_event(),
            Some((EventType::ErrorDetected, "button_press"))
        );
        assert_eq!(
            Trigger::RebootCompleted.recorded_event(),
            Some((EventType::RebootCompleted, "worker_auto"))
        );
        assert_eq!(Trigger::RemoteError.recorded_event(), None);
        assert_eq!(Trigger::RemoteReboot.recorded_event(), None);
    }

    #[tokio::test]
    async fn busy_sensor_refuses_triggers_until_settled() {
        let machine = StateMachine::new(["SENSOR-001", "SENSOR-002"]);

        let Admission::Started(t) = machine.begin("SENSOR-001", Trigger::ButtonPress).await else {
            panic!("press from Online must be admitted");
        };
        assert!(machine.is_busy("SENSOR-001").await);
        assert_eq!(
            machine.begin("SENSOR-001", Trigger::ButtonPress).await,
            Admission::Busy
        );

        // Other sensors are independent.
        assert!(matches!(
            machine.begin("SENSOR-002", Trigger::ButtonPress).await,
            Admission::Started(_)
        ));

        machine.commit(&t).await;
        assert_eq!(machine.state("SENSOR-001").await, Some(SensorStatus::Error));
        assert_eq!(
            machine.begin("SENSOR-001", Trigger::ButtonPress).await,
            Admission::Ignored(SensorStatus::Error)
        );
    }

    #[tokio::test]
    async fn revert_restores_prior_state_for_retry() {
        let machine = StateMachine::new(["SENSOR-001"]);
        let Admission::Started(t) = machine.begin("SENSOR-001", Trigger::ButtonPress).await else {
            panic!("press from Online must be admitted");
        };
        machine.revert(&t).await;

        assert_eq!(machine.state("SENSOR-001").await, Some(SensorStatus::Online));
        assert!(!machine.is_busy("SENSOR-001").await);
        assert!(matches!(
            machine.begin("SENSOR-001", Trigger::ButtonPress).await,
            Admission::Started(_)
        ));
    }

    #[tokio::test]
    async fn unknown_sensor_is_reported() {
        let machine = StateMachine::new(["SENSOR-001"]);
        assert_eq!(
            machine.begin("SENSOR-404", Trigger::ButtonPress).await,
            Admission::UnknownSensor
        );
        assert!(!machine.hydrate("SENSOR-404", SensorStatus::Error).await);
        assert_eq!(machine.state("SENSOR-404").await, None);
    }

    #[tokio::test]
    async fn remote_observations_track_last_known() {
        let machine = StateMachine::new(["SENSOR-001"]);
        assert_eq!(
            machine
                .observe_remote("SENSOR-001", SensorStatus::Error)
                .await,
            None
        );
        assert_eq!(
            machine
                .observe_remote("SENSOR-001", SensorStatus::Rebooting)
                .await,
            Some(SensorStatus::Error)
        );

        machine.hydrate("SENSOR-001", SensorStatus::Error).await;
        let Admission::Started(t) = machine.begin("SENSOR-001", Trigger::RemoteReboot).await else {
            panic!("remote reboot from Error must be admitted");
        };
        machine.commit(&t).await;
        assert_eq!(
            machine
                .observe_remote("SENSOR-001", SensorStatus::Rebooting)
                .await,
            Some(SensorStatus::Rebooting)
        );
    }

    #[tokio::test]
    async fn snapshot_lists_every_sensor() {
        let machine = StateMachine::new(["SENSOR-002", "SENSOR-001"]);
        machine.hydrate("SENSOR-002", SensorStatus::Error).await;
        let snapshot = machine.snapshot().await;
        assert_eq!(snapshot.get("SENSOR-001"), Some(&SensorStatus::Online));
        assert_eq!(snapshot.get("SENSOR-002"), Some(&SensorStatus::Error));
        assert_eq!(machine.sensor_ids(), vec!["SENSOR-001", "SENSOR-002"]);
    }
}
