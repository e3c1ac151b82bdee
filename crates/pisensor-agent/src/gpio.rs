//! GPIO line access.
//!
//! Two backends implement [`Gpio`]:
//!
//! - [`SysfsGpio`] drives real pins through the Linux sysfs interface
//!   (`export`, `gpioN/direction`, `gpioN/value`).
//! - [`SimulatedGpio`] keeps levels in memory, for running the agent on a
//!   development machine. Inputs idle high and can be pulled low by hand.
//!
//! Sysfs cannot enable the internal pull-up. Button lines need an external
//! pull-up or a device-tree overlay that sets one.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use pisensor_core::config::{GpioBackend, GpioConfig};
use pisensor_core::{HardwareError, InputLines};

/// Direction a line was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Read-only line.
    Input,
    /// Driven line.
    Output,
}

impl Direction {
    const fn as_sysfs(self) -> &'static str {
        match self {
            Self::Input => "in",
            Self::Output => "out",
        }
    }
}

/// Line-level GPIO access used by the indicator, the buzzer, and the
/// button inputs.
pub trait Gpio: InputLines {
    /// Claim a line and set its direction. Outputs start low.
    fn open(&self, pin: u32, direction: Direction) -> Result<(), HardwareError>;

    /// Drive an output line.
    fn write_level(&self, pin: u32, high: bool) -> Result<(), HardwareError>;
}

/// Build the backend selected in configuration.
pub fn open_backend(config: &GpioConfig) -> Arc<dyn Gpio> {
    match config.backend {
        GpioBackend::Sysfs => {
            tracing::info!(root = %config.sysfs_root, "Using sysfs GPIO backend");
            Arc::new(SysfsGpio::new(&config.sysfs_root))
        }
        GpioBackend::Simulated => {
            tracing::info!("Using simulated GPIO backend");
            Arc::new(SimulatedGpio::default())
        }
    }
}

fn pin_error(pin: u32, action: &str, err: impl std::fmt::Display) -> HardwareError {
    HardwareError::Pin {
        pin,
        message: format!("{action}: {err}"),
    }
}

/// The button input lines, opened as inputs on a shared backend.
pub struct ButtonLines {
    gpio: Arc<dyn Gpio>,
}

impl ButtonLines {
    /// Open every pin in `pins` as an input.
    pub fn open(
        gpio: Arc<dyn Gpio>,
        pins: impl IntoIterator<Item = u32>,
    ) -> Result<Self, HardwareError> {
        for pin in pins {
            gpio.open(pin, Direction::Input)?;
        }
        Ok(Self { gpio })
    }
}

impl InputLines for ButtonLines {
    fn read_level(&self, pin: u32) -> Result<bool, HardwareError> {
        self.gpio.read_level(pin)
    }
}

// ---------------------------------------------------------------------------
// Sysfs
// ---------------------------------------------------------------------------

/// Linux sysfs GPIO backend.
#[derive(Debug, Clone)]
pub struct SysfsGpio {
    root: PathBuf,
}

impl SysfsGpio {
    /// Use the sysfs tree at `root` (normally `/sys/class/gpio`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    fn export(&self, pin: u32) -> Result<(), HardwareError> {
        if self.pin_dir(pin).exists() {
            return Ok(());
        }
        fs::write(self.root.join("export"), pin.to_string())
            .map_err(|e| pin_error(pin, "export", e))
    }
}

impl InputLines for SysfsGpio {
    fn read_level(&self, pin: u32) -> Result<bool, HardwareError> {
        let raw = fs::read_to_string(self.pin_dir(pin).join("value"))
            .map_err(|e| pin_error(pin, "read value", e))?;
        match raw.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(pin_error(pin, "read value", format!("unexpected {other:?}"))),
        }
    }
}

impl Gpio for SysfsGpio {
    fn open(&self, pin: u32, direction: Direction) -> Result<(), HardwareError> {
        self.export(pin)?;
        let dir = self.pin_dir(pin);
        fs::write(dir.join("direction"), direction.as_sysfs())
            .map_err(|e| pin_error(pin, "set direction", e))?;
        if direction == Direction::Output {
            self.write_level(pin, false)?;
        }
        tracing::debug!(pin, ?direction, "GPIO line opened");
        Ok(())
    }

    fn write_level(&self, pin: u32, high: bool) -> Result<(), HardwareError> {
        let value = if high { "1" } else { "0" };
        fs::write(self.pin_dir(pin).join("value"), value)
            .map_err(|e| pin_error(pin, "write value", e))
    }
}

// ---------------------------------------------------------------------------
// Simulated
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct SimLine {
    direction: Direction,
    high: bool,
}

/// In-memory GPIO backend.
#[derive(Debug, Default)]
pub struct SimulatedGpio {
    lines: Mutex<HashMap<u32, SimLine>>,
}

impl SimulatedGpio {
    /// Set the level seen on an input line, as if a button were pressed
    /// (`false`) or released (`true`).
    pub fn set_input(&self, pin: u32, high: bool) -> Result<(), HardwareError> {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        match lines.get_mut(&pin) {
            Some(line) if line.direction == Direction::Input => {
                line.high = high;
                Ok(())
            }
            Some(_) => Err(pin_error(pin, "set input", "line is an output")),
            None => Err(HardwareError::NotConfigured(pin)),
        }
    }

    /// Current level of any opened line.
    pub fn level(&self, pin: u32) -> Option<bool> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&pin)
            .map(|line| line.high)
    }
}

impl InputLines for SimulatedGpio {
    fn read_level(&self, pin: u32) -> Result<bool, HardwareError> {
        self.level(pin).ok_or(HardwareError::NotConfigured(pin))
    }
}

impl Gpio for SimulatedGpio {
    fn open(&self, pin: u32, direction: Direction) -> Result<(), HardwareError> {
        let high = direction == Direction::Input;
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pin, SimLine { direction, high });
        Ok(())
    }

    fn write_level(&self, pin: u32, high: bool) -> Result<(), HardwareError> {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        match lines.get_mut(&pin) {
            Some(line) if line.direction == Direction::Output => {
                line.high = high;
                tracing::trace!(pin, high, "Simulated line written");
                Ok(())
            }
            Some(_) => Err(pin_error(pin, "write value", "line is an input")),
            None => Err(HardwareError::NotConfigured(pin)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Lay out a fake sysfs tree where `pin` is already exported.
    fn fake_sysfs(pin: u32, value: &str) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(format!("gpio{pin}"));
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("direction"), "in").unwrap();
        fs::write(dir.join("value"), value).unwrap();
        fs::write(root.path().join("export"), "").unwrap();
        root
    }

    #[test]
    fn sysfs_reads_input_levels() {
        let root = fake_sysfs(23, "1\n");
        let gpio = SysfsGpio::new(root.path());
        gpio.open(23, Direction::Input).unwrap();
        assert!(gpio.read_level(23).unwrap());

        fs::write(root.path().join("gpio23/value"), "0\n").unwrap();
        assert!(!gpio.read_level(23).unwrap());
    }

    #[test]
    fn sysfs_output_starts_low_and_writes() {
        let root = fake_sysfs(17, "1");
        let gpio = SysfsGpio::new(root.path());
        gpio.open(17, Direction::Output).unwrap();

        let dir = root.path().join("gpio17");
        assert_eq!(fs::read_to_string(dir.join("direction")).unwrap(), "out");
        assert_eq!(fs::read_to_string(dir.join("value")).unwrap(), "0");

        gpio.write_level(17, true).unwrap();
        assert_eq!(fs::read_to_string(dir.join("value")).unwrap(), "1");
    }

    #[test]
    fn sysfs_exports_unexported_pins() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("export"), "").unwrap();
        let gpio = SysfsGpio::new(root.path());

        // The kernel would create gpio24/ in response; the fake tree does not.
        assert!(gpio.open(24, Direction::Input).is_err());
        assert_eq!(fs::read_to_string(root.path().join("export")).unwrap(), "24");
    }

    #[test]
    fn sysfs_rejects_garbage_values() {
        let root = fake_sysfs(23, "x");
        let gpio = SysfsGpio::new(root.path());
        assert!(matches!(
            gpio.read_level(23),
            Err(HardwareError::Pin { pin: 23, .. })
        ));
    }

    #[test]
    fn simulated_inputs_idle_high() {
        let gpio = SimulatedGpio::default();
        gpio.open(23, Direction::Input).unwrap();
        assert!(gpio.read_level(23).unwrap());

        gpio.set_input(23, false).unwrap();
        assert!(!gpio.read_level(23).unwrap());
        assert!(matches!(
            gpio.read_level(99),
            Err(HardwareError::NotConfigured(99))
        ));
    }

    #[test]
    fn simulated_directions_are_enforced() {
        let gpio = SimulatedGpio::default();
        gpio.open(17, Direction::Output).unwrap();
        gpio.open(23, Direction::Input).unwrap();

        gpio.write_level(17, true).unwrap();
        assert_eq!(gpio.level(17), Some(true));
        assert!(gpio.write_level(23, true).is_err());
        assert!(gpio.set_input(17, false).is_err());
    }
}
