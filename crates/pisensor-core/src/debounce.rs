//! Input debouncer: raw line levels in, one "pressed" edge per press out.
//!
//! Lines are wired with pull-ups, so idle is high and pressed is low. A
//! new level must be seen on `required_samples` consecutive samples before
//! it replaces the stable level; a press is reported only when the stable
//! level goes from high to low. Releases and a held-low line report
//! nothing.

use crate::config::SensorBinding;

/// Debounce state of one input line.
#[derive(Debug, Clone)]
struct LineState {
    pin: u32,
    sensor_id: String,
    stable_high: bool,
    pending_high: bool,
    pending_count: u32,
}

/// Debouncer for a fixed set of input lines.
#[derive(Debug, Clone)]
pub struct Debouncer {
    lines: Vec<LineState>,
    required_samples: u32,
}

impl Debouncer {
    /// Build a debouncer for the given bindings. Every line starts idle
    /// (high). `required_samples` is clamped to at least one.
    pub fn new(bindings: &[SensorBinding], required_samples: u32) -> Self {
        let lines = bindings
            .iter()
            .map(|b| LineState {
                pin: b.pin,
                sensor_id: b.id.clone(),
                stable_high: true,
                pending_high: true,
                pending_count: 0,
            })
            .collect();
        Self {
            lines,
            required_samples: required_samples.max(1),
        }
    }

    /// Pins this debouncer samples, in binding order.
    pub fn pins(&self) -> impl Iterator<Item = u32> + '_ {
        self.lines.iter().map(|l| l.pin)
    }

    /// Feed one sample for a pin. Returns the sensor id when this sample
    /// completes a debounced press. Samples for unmapped pins are ignored.
    pub fn observe(&mut self, pin: u32, high: bool) -> Option<&str> {
        let required = self.required_samples;
        let line = self.lines.iter_mut().find(|l| l.pin == pin)?;

        if high == line.stable_high {
            line.pending_count = 0;
            return None;
        }

        if high == line.pending_high {
            line.pending_count = line.pending_count.saturating_add(1);
        } else {
            line.pending_high = high;
            line.pending_count = 1;
        }

        if line.pending_count < required {
            return None;
        }

        line.stable_high = high;
        line.pending_count = 0;
        if high {
            None
        } else {
            Some(line.sensor_id.as_str())
        }
    }
}
