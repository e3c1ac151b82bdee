//! Hardware assembly for the agent.
//!
//! Opens every line the agent needs before any loop starts. A line that
//! cannot be opened is a startup failure.

use std::sync::Arc;

use pisensor_core::config::AgentConfig;
use pisensor_core::{AmbientPattern, HardwareError, Outputs};

use crate::buzzer::{Buzzer, SilentPattern};
use crate::gpio::{ButtonLines, Gpio};
use crate::indicator::RgbIndicator;

/// Opened inputs and outputs.
pub struct Hardware {
    /// Button input lines.
    pub buttons: ButtonLines,
    /// Indicator and ambient pattern.
    pub outputs: Outputs,
}

impl Hardware {
    /// Open the button lines, the RGB indicator, and the buzzer (or a
    /// silent pattern when the buzzer is disabled).
    pub fn open(gpio: &Arc<dyn Gpio>, config: &AgentConfig) -> Result<Self, HardwareError> {
        let buttons = ButtonLines::open(
            Arc::clone(gpio),
            config.sensors.iter().map(|binding| binding.pin),
        )?;
        let indicator = RgbIndicator::open(Arc::clone(gpio), config.indicator.clone())?;
        let ambient: Arc<dyn AmbientPattern> = if config.buzzer.enabled {
            Arc::new(Buzzer::open(Arc::clone(gpio), config.buzzer.pin)?)
        } else {
            tracing::info!("Buzzer disabled");
            Arc::new(SilentPattern)
        };

        tracing::info!(
            buttons = ?config.sensors.iter().map(|b| b.pin).collect::<Vec<_>>(),
            "Hardware ready"
        );
        Ok(Self {
            buttons,
            outputs: Outputs::new(Arc::new(indicator), ambient),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pisensor_core::InputLines;

    use super::*;
    use crate::gpio::SimulatedGpio;

    #[test]
    fn opens_buttons_as_idle_inputs() {
        let gpio: Arc<dyn Gpio> = Arc::new(SimulatedGpio::default());
        let hardware = Hardware::open(&gpio, &AgentConfig::default()).unwrap();
        assert!(hardware.buttons.read_level(23).unwrap());
        assert!(hardware.buttons.read_level(24).unwrap());
        assert!(hardware.buttons.read_level(5).is_err());
    }

    #[test]
    fn unopenable_lines_fail_startup() {
        let root = tempfile::tempdir().unwrap();
        let gpio: Arc<dyn Gpio> = Arc::new(crate::gpio::SysfsGpio::new(root.path()));
        assert!(matches!(
            Hardware::open(&gpio, &AgentConfig::default()),
            Err(HardwareError::Pin { pin: 23, .. })
        ));
    }
}
