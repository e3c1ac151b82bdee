//! Active buzzer: the ambient beep pattern and the reboot chime.
//!
//! The ambient pattern loops on its own task while every sensor is
//! healthy. The chime is three short beeps played once when a reboot
//! completes. Both take the line lock for a whole phrase, so a chime never
//! lands in the middle of a pattern. Stopping the pattern lets a chime
//! finish; [`AmbientPattern::silence`] cuts both.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use pisensor_core::{AmbientPattern, HardwareError};
use tokio::task::JoinHandle;

use crate::gpio::{Direction, Gpio};

/// Ambient rhythm as `(on_ms, off_ms)` pairs.
pub const AMBIENT_PATTERN: [(u64, u64); 11] = [
    (150, 100),
    (150, 100),
    (300, 200),
    (150, 100),
    (150, 100),
    (300, 200),
    (150, 100),
    (150, 100),
    (150, 100),
    (150, 100),
    (400, 500),
];

/// Silence between repetitions of [`AMBIENT_PATTERN`].
pub const PATTERN_GAP: Duration = Duration::from_millis(2000);

/// Beeps in the reboot chime.
const CHIME_BEEPS: usize = 3;

/// On and off time of each chime beep.
const CHIME_BEEP: Duration = Duration::from_millis(100);

/// Buzzer line shared by the ambient task and chime tasks.
#[derive(Clone)]
struct Line {
    gpio: Arc<dyn Gpio>,
    pin: u32,
    phrase: Arc<tokio::sync::Mutex<()>>,
}

impl Line {
    /// Drive the line. Returns `false` after logging if the write failed.
    fn set(&self, high: bool) -> bool {
        match self.gpio.write_level(self.pin, high) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(pin = self.pin, error = %e, "Buzzer write failed");
                false
            }
        }
    }

    async fn beep(&self, on: Duration, off: Duration) -> bool {
        if !self.set(true) {
            return false;
        }
        tokio::time::sleep(on).await;
        if !self.set(false) {
            return false;
        }
        tokio::time::sleep(off).await;
        true
    }

    async fn play_ambient(self) {
        loop {
            {
                let _phrase = self.phrase.lock().await;
                for (on_ms, off_ms) in AMBIENT_PATTERN {
                    if !self
                        .beep(Duration::from_millis(on_ms), Duration::from_millis(off_ms))
                        .await
                    {
                        return;
                    }
                }
            }
            tokio::time::sleep(PATTERN_GAP).await;
        }
    }

    async fn play_chime(self) {
        let _phrase = self.phrase.lock().await;
        for _ in 0..CHIME_BEEPS {
            if !self.beep(CHIME_BEEP, CHIME_BEEP).await {
                return;
            }
        }
        tracing::info!(pin = self.pin, "Reboot chime played");
    }
}

/// Active buzzer on one output line.
pub struct Buzzer {
    line: Line,
    ambient: Mutex<Option<JoinHandle<()>>>,
    chime: Mutex<Option<JoinHandle<()>>>,
}

impl Buzzer {
    /// Open `pin` as an output, silent.
    pub fn open(gpio: Arc<dyn Gpio>, pin: u32) -> Result<Self, HardwareError> {
        gpio.open(pin, Direction::Output)?;
        tracing::info!(pin, "Buzzer ready");
        Ok(Self {
            line: Line {
                gpio,
                pin,
                phrase: Arc::new(tokio::sync::Mutex::new(())),
            },
            ambient: Mutex::new(None),
            chime: Mutex::new(None),
        })
    }

    /// Whether the ambient loop is running.
    pub fn is_playing(&self) -> bool {
        self.ambient
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn spawn(&self, future: impl Future<Output = ()> + Send + 'static) -> Option<JoinHandle<()>> {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(future)),
            Err(e) => {
                tracing::error!(pin = self.line.pin, error = %e, "No runtime to play buzzer on");
                None
            }
        }
    }
}

impl AmbientPattern for Buzzer {
    fn start(&self) {
        let mut slot = self.ambient.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        *slot = self.spawn(self.line.clone().play_ambient());
        tracing::debug!(pin = self.line.pin, "Ambient pattern started");
    }

    fn stop(&self) {
        let task = self
            .ambient
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
            tracing::debug!(pin = self.line.pin, "Ambient pattern stopped");
        }
        self.line.set(false);
    }

    fn chime(&self) {
        let task = self.spawn(self.line.clone().play_chime());
        let previous = std::mem::replace(
            &mut *self.chime.lock().unwrap_or_else(PoisonError::into_inner),
            task,
        );
        // A chime still queued behind the phrase lock is superseded.
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn silence(&self) {
        let task = self
            .chime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
        self.stop();
    }
}

impl Drop for Buzzer {
    fn drop(&mut self) {
        for slot in [&mut self.ambient, &mut self.chime] {
            if let Some(task) = slot.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
                task.abort();
            }
        }
    }
}

/// Ambient pattern used when the buzzer is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPattern;

impl AmbientPattern for SilentPattern {
    fn start(&self) {}

    fn stop(&self) {}

    fn chime(&self) {
        tracing::debug!("Buzzer disabled, chime skipped");
    }
}
