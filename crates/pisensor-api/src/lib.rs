//! HTTP API for the Pi sensor monitoring agent.
//!
//! Exposes the shared status table and event log over JSON:
//!
//! - **Status endpoints** for listing, reading, and manually writing status
//!   rows, plus the current status of a sensor
//! - **Command endpoints** that force an error or command a reboot, each
//!   recording a status row and an event
//! - **Event endpoints** for listing, reading, and appending events
//! - **Poll endpoints** that return everything after a row id, for
//!   consumers without a push channel
//!
//! # Architecture
//!
//! The API keeps no sensor state. It reads and appends to the same store
//! the on-device agent uses, and the agent discovers commands by polling
//! the current status.

pub mod commands;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
