//! Shared type definitions for the Pi sensor monitoring agent.
//!
//! This crate is the single source of truth for the records exchanged
//! between the on-device agent, the shared store, and the HTTP API. Types
//! flow downstream to `TypeScript` via `ts-rs` for API consumers.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for record identities
//! - [`enums`] -- Sensor status, indicator color, and event type
//! - [`records`] -- Status rows, event log entries, filters, poll envelope

pub mod enums;
pub mod ids;
pub mod records;

// Re-export all public types at crate root for convenience.
pub use enums::{EventType, IndicatorColor, ParseEnumError, SensorStatus};
pub use ids::{EventId, StatusId};
pub use records::{
    EventFilter, EventRecord, NewEvent, NewStatus, PollResponse, StatusFilter, StatusRecord,
};

/// Actor recorded when a physical button press causes a transition.
pub const ACTOR_BUTTON_PRESS: &str = "button_press";

/// Actor recorded when the agent itself completes a commanded reboot.
pub const ACTOR_WORKER_AUTO: &str = "worker_auto";
