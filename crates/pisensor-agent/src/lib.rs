//! On-device sensor agent.
//!
//! Binds the lifecycle core in `pisensor-core` to real (or simulated)
//! hardware and to a remote status transport.
//!
//! # Modules
//!
//! - [`gpio`] -- Sysfs and simulated GPIO backends, button input lines
//! - [`indicator`] -- RGB LED indicator
//! - [`buzzer`] -- Ambient beep pattern and reboot chime
//! - [`hardware`] -- Opening every line at startup
//! - [`remote`] -- HTTP and direct-store status transports
//! - [`error`] -- Startup errors

pub mod buzzer;
pub mod error;
pub mod gpio;
pub mod hardware;
pub mod indicator;
pub mod remote;

pub use error::AgentError;
pub use hardware::Hardware;
pub use remote::{HttpStatusSource, RemoteSource};
