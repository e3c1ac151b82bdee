//! Enumeration types for sensor lifecycle, indicator output, and events.
//!
//! All three enums serialize as their variant name (`"Online"`,
//! `"ErrorDetected"`, ...). The same spelling is stored in the database and
//! accepted by the HTTP API, so [`FromStr`] is the single validation point
//! for incoming enum strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A string could not be parsed into one of the enums in this module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseEnumError {
    /// Name of the enum that was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor status
// ---------------------------------------------------------------------------

/// Lifecycle state of a monitored sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum SensorStatus {
    /// Sensor is healthy.
    Online,
    /// A fault was detected (button press or forced by an operator).
    Error,
    /// A reboot was commanded and has not been acknowledged by the agent yet.
    Rebooting,
}

impl SensorStatus {
    /// All variants in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Online, Self::Error, Self::Rebooting];

    /// Stable string form used in storage and on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Error => "Error",
            Self::Rebooting => "Rebooting",
        }
    }

    /// Indicator color that accompanies this status in a status row.
    pub const fn indicator(self) -> IndicatorColor {
        match self {
            Self::Online => IndicatorColor::Green,
            Self::Error => IndicatorColor::Red,
            Self::Rebooting => IndicatorColor::Off,
        }
    }
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("sensor status", s))
    }
}

// ---------------------------------------------------------------------------
// Indicator color
// ---------------------------------------------------------------------------

/// Indicator color recorded alongside a status row.
///
/// Derived from the status; the status column is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum IndicatorColor {
    /// All good.
    Green,
    /// Sensor fault.
    Red,
    /// Indicator dark (rebooting).
    Off,
}

impl IndicatorColor {
    /// All variants.
    pub const ALL: [Self; 3] = [Self::Green, Self::Red, Self::Off];

    /// Stable string form used in storage and on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Green => "Green",
            Self::Red => "Red",
            Self::Off => "Off",
        }
    }
}

impl fmt::Display for IndicatorColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorColor {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("indicator color", s))
    }
}

// ---------------------------------------------------------------------------
// Event type
// ---------------------------------------------------------------------------

/// Kind of lifecycle event appended to the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EventType {
    /// Sensor entered `Error`.
    ErrorDetected,
    /// Sensor entered `Rebooting`.
    RebootStarted,
    /// Sensor came back `Online` after a reboot.
    RebootCompleted,
}

impl EventType {
    /// All variants.
    pub const ALL: [Self; 3] = [
        Self::ErrorDetected,
        Self::RebootStarted,
        Self::RebootCompleted,
    ];

    /// Stable string form used in storage and on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ErrorDetected => "ErrorDetected",
            Self::RebootStarted => "RebootStarted",
            Self::RebootCompleted => "RebootCompleted",
        }
    }

    /// The status a sensor holds once this event has happened.
    pub const fn resulting_status(self) -> SensorStatus {
        match self {
            Self::ErrorDetected => SensorStatus::Error,
            Self::RebootStarted => SensorStatus::Rebooting,
            Self::RebootCompleted => SensorStatus::Online,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("event type", s))
    }
}
