//! Sensor lifecycle core for the Pi sensor monitoring agent.
//!
//! Owns the state machine that decides which transitions are legal, the
//! orchestrator that records them, the poller that detects commands issued
//! through the API, and the loops that tie these to the hardware.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `pisensor-config.yaml`
//! - [`capability`] -- Traits for indicator, ambient pattern, input lines,
//!   and remote status reads
//! - [`debounce`] -- Raw input levels to one edge per press
//! - [`machine`] -- Per-sensor state machine with busy flags
//! - [`orchestrator`] -- Status row plus event per transition
//! - [`poller`] -- Remote status edge detection
//! - [`outputs`] -- Aggregate indicator and ambient control
//! - [`agent`] -- The concurrent agent loops
//! - [`telemetry`] -- Log subscriber setup for the binaries

pub mod agent;
pub mod capability;
pub mod config;
pub mod debounce;
pub mod machine;
pub mod orchestrator;
pub mod outputs;
pub mod poller;
pub mod telemetry;

pub use agent::{SensorAgent, TriggerOutcome};
pub use capability::{
    AmbientPattern, HardwareError, Indicator, InputLines, RemoteStatusSource, TransportError,
};
pub use config::{ConfigError, PiSensorConfig};
pub use machine::{StateMachine, Trigger};
pub use orchestrator::{AppliedTransition, Orchestrator, OrchestratorError};
pub use outputs::{OutputView, Outputs};
pub use poller::{PollOutcome, RemotePoller};
