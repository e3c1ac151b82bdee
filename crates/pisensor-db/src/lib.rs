//! Shared store for the Pi sensor monitoring agent (`SQLite`).
//!
//! The on-device agent and the HTTP API open the same database. Two tables
//! carry all state:
//!
//! ```text
//! sensor_status   latest-wins snapshots, one row per transition
//! sensor_events   append-only lifecycle log (UPDATE/DELETE rejected)
//! ```
//!
//! Both tables assign a monotonically increasing `row_id` at insert time.
//! Readers poll with `row_id > sinceRowId` to pick up changes made by other
//! processes.
//!
//! # Modules
//!
//! - [`sqlite`] -- Connection pool, configuration, and migrations
//! - [`status_store`] -- Status snapshot inserts, reads, and manual updates
//! - [`event_store`] -- Event appends and reads
//! - [`journal`] -- The write seam used by the transition orchestrator
//! - [`error`] -- Shared error types

pub mod error;
pub mod event_store;
pub mod journal;
pub mod sqlite;
pub mod status_store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use event_store::{EventRow, EventStore};
pub use journal::SensorJournal;
pub use sqlite::{Database, SqliteConfig};
pub use status_store::{StatusRow, StatusStore, StatusUpdate};
