//! Remote status poller.
//!
//! The agent has no push channel from the API, so it re-reads each
//! sensor's authoritative status on a fixed interval and turns forward
//! edges it did not cause into triggers for the state machine:
//!
//! - local `Error`, remote moved to `Rebooting`: an operator commanded a
//!   reboot ([`Trigger::RemoteReboot`]).
//! - local `Online`, remote moved to `Error`: someone forced an error
//!   ([`Trigger::RemoteError`], only with `follow_remote_errors`).
//! - local `Rebooting`: the reboot was adopted but its completion was not
//!   recorded yet, so completion is retried without reading.
//!
//! An edge is a change against the last status this agent knew about, so
//! a status that stays put never fires twice. Failed or timed-out reads
//! change nothing.

use std::time::Duration;

use pisensor_types::SensorStatus;

use crate::capability::{RemoteStatusSource, TransportError};
use crate::machine::{StateMachine, Trigger};

/// What one poll of one sensor concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A transition for the sensor was already in flight.
    Busy,
    /// The read failed or timed out; nothing changed.
    Unknown,
    /// The store has no status for the sensor.
    Absent,
    /// The read succeeded and called for no action.
    Unchanged(SensorStatus),
    /// The state machine should be driven with this trigger.
    Trigger(Trigger),
}

/// Trigger implied by a remote read, given the local state and the last
/// known remote status.
pub fn remote_trigger(
    local: SensorStatus,
    previous: Option<SensorStatus>,
    remote: SensorStatus,
    follow_remote_errors: bool,
) -> Option<Trigger> {
    if previous == Some(remote) {
        return None;
    }
    match (local, remote) {
        (SensorStatus::Error, SensorStatus::Rebooting) => Some(Trigger::RemoteReboot),
        (SensorStatus::Online, SensorStatus::Error) if follow_remote_errors => {
            Some(Trigger::RemoteError)
        }
        _ => None,
    }
}

/// Reads remote status through a [`RemoteStatusSource`] with a bounded
/// wait.
#[derive(Debug, Clone)]
pub struct RemotePoller<R> {
    source: R,
    timeout: Duration,
    follow_remote_errors: bool,
}

impl<R: RemoteStatusSource> RemotePoller<R> {
    /// Create a poller.
    pub const fn new(source: R, timeout: Duration, follow_remote_errors: bool) -> Self {
        Self {
            source,
            timeout,
            follow_remote_errors,
        }
    }

    /// Read a sensor's remote status, failing with
    /// [`TransportError::Timeout`] if the source does not answer in time.
    pub async fn read(&self, sensor_id: &str) -> Result<Option<SensorStatus>, TransportError> {
        tokio::time::timeout(self.timeout, self.source.current_status(sensor_id))
            .await
            .map_err(|_elapsed| TransportError::Timeout(self.timeout))?
    }

    /// Poll one sensor and decide what, if anything, to do.
    pub async fn check(&self, machine: &StateMachine, sensor_id: &str) -> PollOutcome {
        if machine.is_busy(sensor_id).await {
            return PollOutcome::Busy;
        }
        let Some(local) = machine.state(sensor_id).await else {
            return PollOutcome::Absent;
        };
        if local == SensorStatus::Rebooting {
            return PollOutcome::Trigger(Trigger::RebootCompleted);
        }

        let remote = match self.read(sensor_id).await {
            Ok(Some(remote)) => remote,
            Ok(None) => return PollOutcome::Absent,
            Err(e) => {
                tracing::warn!(sensor_id, error = %e, "Remote status unknown, retrying next interval");
                return PollOutcome::Unknown;
            }
        };

        let previous = machine.observe_remote(sensor_id, remote).await;
        match remote_trigger(local, previous, remote, self.follow_remote_errors) {
            Some(trigger) => {
                tracing::info!(
                    sensor_id,
                    %local,
                    %remote,
                    %trigger,
                    "Remote status change detected"
                );
                PollOutcome::Trigger(trigger)
            }
            None => PollOutcome::Unchanged(remote),
        }
    }
}
