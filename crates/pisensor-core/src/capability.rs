//! Hardware and transport capabilities consumed by the agent.
//!
//! The agent never touches GPIO pins or the network directly. It talks to
//! these traits, which the agent binary implements for real hardware (or a
//! simulation) and the tests implement with recording fakes.
//!
//! Output and input capabilities are synchronous: a GPIO write or read is a
//! short blocking call. The remote status read is asynchronous and is
//! always wrapped in a timeout by the caller.

use std::future::Future;
use std::time::Duration;

use pisensor_db::{Database, DbError};
use pisensor_types::SensorStatus;

/// Errors from GPIO-backed capabilities.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// A pin could not be exported, configured, read, or written.
    #[error("GPIO pin {pin}: {message}")]
    Pin {
        /// BCM pin number.
        pin: u32,
        /// What failed.
        message: String,
    },

    /// The requested pin was never set up.
    #[error("GPIO pin {0} is not configured")]
    NotConfigured(u32),
}

/// Errors from the remote status transport.
///
/// The poller treats every variant as "unknown" and retries next interval.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The read did not finish within the configured bound.
    #[error("remote status read timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be sent or the connection failed.
    #[error("remote status request failed: {0}")]
    Request(String),

    /// The remote answered with an unexpected HTTP status.
    #[error("remote status read returned HTTP {0}")]
    Status(u16),

    /// The response body could not be decoded.
    #[error("remote status response could not be decoded: {0}")]
    Decode(String),

    /// Reading the shared store directly failed.
    #[error("store read failed: {0}")]
    Store(#[from] DbError),
}

/// Visual status output.
pub trait Indicator: Send + Sync {
    /// Show the all-clear state.
    fn set_normal(&self) -> Result<(), HardwareError>;

    /// Show an error for one sensor.
    fn set_error_for_sensor(&self, sensor_id: &str) -> Result<(), HardwareError>;

    /// Show errors for several sensors at once.
    ///
    /// The default shows the last sensor in the slice; indicators that can
    /// express a combined fault override this.
    fn set_error_for_sensors(&self, sensor_ids: &[String]) -> Result<(), HardwareError> {
        match sensor_ids.last() {
            Some(sensor_id) => self.set_error_for_sensor(sensor_id),
            None => self.set_normal(),
        }
    }

    /// Switch the indicator off.
    fn off(&self) -> Result<(), HardwareError>;
}

/// Looping audible pattern played while every sensor is healthy.
pub trait AmbientPattern: Send + Sync {
    /// Start the loop. Starting a running pattern is a no-op.
    fn start(&self);

    /// Stop the loop and silence the output.
    fn stop(&self);

    /// Play a short acknowledgement that a reboot finished.
    fn chime(&self);

    /// Stop everything, including a chime in progress, and leave the output
    /// silent. Called once before the agent exits.
    fn silence(&self) {
        self.stop();
    }
}

/// Raw digital input lines.
pub trait InputLines: Send + Sync {
    /// Current level of a pin. `true` is high (idle, with pull-up wiring).
    fn read_level(&self, pin: u32) -> Result<bool, HardwareError>;
}

/// Authoritative current status of a sensor, as seen by other processes.
pub trait RemoteStatusSource: Send + Sync {
    /// Read the current status of a sensor. `Ok(None)` means the sensor
    /// has no status rows yet.
    fn current_status(
        &self,
        sensor_id: &str,
    ) -> impl Future<Output = Result<Option<SensorStatus>, TransportError>> + Send;
}

/// Reads the shared store directly, for agents co-located with the store.
impl RemoteStatusSource for Database {
    async fn current_status(&self, sensor_id: &str) -> Result<Option<SensorStatus>, TransportError> {
        let record = self.statuses().current(sensor_id).await?;
        Ok(record.map(|r| r.status))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct LastCall(Mutex<Vec<String>>);

    impl Indicator for LastCall {
        fn set_normal(&self) -> Result<(), HardwareError> {
            self.0.lock().unwrap().push("normal".to_owned());
            Ok(())
        }

        fn set_error_for_sensor(&self, sensor_id: &str) -> Result<(), HardwareError> {
            self.0.lock().unwrap().push(format!("error:{sensor_id}"));
            Ok(())
        }

        fn off(&self) -> Result<(), HardwareError> {
            self.0.lock().unwrap().push("off".to_owned());
            Ok(())
        }
    }

    #[test]
    fn default_multi_error_shows_last_sensor() {
        let indicator = LastCall::default();
        indicator
            .set_error_for_sensors(&["SENSOR-001".to_owned(), "SENSOR-002".to_owned()])
            .unwrap();
        indicator.set_error_for_sensors(&[]).unwrap();
        assert_eq!(
            *indicator.0.lock().unwrap(),
            vec!["error:SENSOR-002".to_owned(), "normal".to_owned()]
        );
    }

    #[tokio::test]
    async fn store_source_reads_current_status() {
        use chrono::Utc;
        use pisensor_types::NewStatus;

        let db = Database::in_memory().await.unwrap();
        assert_eq!(db.current_status("SENSOR-001").await.unwrap(), None);

        db.statuses()
            .insert(&NewStatus::derived("SENSOR-001", SensorStatus::Rebooting, "user1", Utc::now()))
            .await
            .unwrap();
        assert_eq!(
            db.current_status("SENSOR-001").await.unwrap(),
            Some(SensorStatus::Rebooting)
        );
    }
}
