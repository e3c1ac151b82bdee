//! RGB LED indicator.
//!
//! Green while every sensor is healthy. A single faulted sensor shows its
//! configured color (red for `SENSOR-001`, blue for `SENSOR-002`, yellow
//! for anything unlisted). Several at once show purple.

use std::sync::Arc;

use pisensor_core::config::{IndicatorConfig, RgbColor};
use pisensor_core::{HardwareError, Indicator};

use crate::gpio::{Direction, Gpio};

/// Three-channel LED driven through [`Gpio`].
pub struct RgbIndicator {
    gpio: Arc<dyn Gpio>,
    config: IndicatorConfig,
}

impl RgbIndicator {
    /// Open the three channel pins as outputs. All channels start dark.
    pub fn open(gpio: Arc<dyn Gpio>, config: IndicatorConfig) -> Result<Self, HardwareError> {
        for pin in [config.red_pin, config.green_pin, config.blue_pin] {
            gpio.open(pin, Direction::Output)?;
        }
        tracing::info!(
            red = config.red_pin,
            green = config.green_pin,
            blue = config.blue_pin,
            "RGB indicator ready"
        );
        Ok(Self { gpio, config })
    }

    /// Drive the channels for `color`.
    pub fn show(&self, color: RgbColor) -> Result<(), HardwareError> {
        let (red, green, blue) = color.channels();
        self.gpio.write_level(self.config.red_pin, red)?;
        self.gpio.write_level(self.config.green_pin, green)?;
        self.gpio.write_level(self.config.blue_pin, blue)?;
        tracing::debug!(?color, "Indicator color set");
        Ok(())
    }
}

impl Indicator for RgbIndicator {
    fn set_normal(&self) -> Result<(), HardwareError> {
        self.show(RgbColor::Green)
    }

    fn set_error_for_sensor(&self, sensor_id: &str) -> Result<(), HardwareError> {
        self.show(self.config.color_for(sensor_id))
    }

    fn set_error_for_sensors(&self, sensor_ids: &[String]) -> Result<(), HardwareError> {
        match sensor_ids {
            [] => self.set_normal(),
            [single] => self.set_error_for_sensor(single),
            _ => self.show(self.config.multiple_color),
        }
    }

    fn off(&self) -> Result<(), HardwareError> {
        self.show(RgbColor::Off)
    }
}
