//! The on-device agent: input, transition, and poll loops.
//!
//! ```text
//! InputLines --sample--> Debouncer --mpsc--> press loop --+
//!                                                         +--> StateMachine --> Orchestrator --> store
//! RemoteStatusSource --poll loop--> RemotePoller ---------+          |
//!                                                                   +--> Outputs (indicator, ambient)
//! ```
//!
//! The three loops run concurrently on one task and each stops at the next
//! suspension point once the shutdown signal flips. Outputs are reset
//! after all loops have returned.

use pisensor_db::SensorJournal;
use pisensor_types::SensorStatus;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::capability::{InputLines, RemoteStatusSource};
use crate::config::AgentConfig;
use crate::debounce::Debouncer;
use crate::machine::{Admission, StateMachine, Trigger};
use crate::orchestrator::Orchestrator;
use crate::outputs::Outputs;
use crate::poller::{PollOutcome, RemotePoller};

/// Buffered debounced presses between the input and press loops.
const EDGE_CHANNEL_CAPACITY: usize = 16;

/// Result of driving the state machine with one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The sensor moved to this state.
    Applied(SensorStatus),
    /// A transition for the sensor was already in flight.
    Busy,
    /// The trigger does not apply in this state.
    Ignored(SensorStatus),
    /// The sensor is not configured on this agent.
    UnknownSensor,
    /// Persisting the transition failed and the state was reverted.
    Failed,
}

/// On-device sensor agent.
pub struct SensorAgent<J, R> {
    config: AgentConfig,
    machine: StateMachine,
    orchestrator: Orchestrator<J>,
    poller: RemotePoller<R>,
    outputs: Outputs,
}

impl<J, R> SensorAgent<J, R>
where
    J: SensorJournal,
    R: RemoteStatusSource,
{
    /// Assemble an agent for the sensors in `config`.
    pub fn new(config: AgentConfig, journal: J, source: R, outputs: Outputs) -> Self {
        let machine = StateMachine::new(config.sensor_ids());
        let poller = RemotePoller::new(
            source,
            config.remote_timeout(),
            config.follow_remote_errors,
        );
        Self {
            config,
            machine,
            orchestrator: Orchestrator::new(journal),
            poller,
            outputs,
        }
    }

    /// The per-sensor state machine.
    pub const fn machine(&self) -> &StateMachine {
        &self.machine
    }

    /// Seed every sensor's state from its stored status and show the
    /// resulting view. Sensors without a readable status start `Online`.
    pub async fn hydrate(&self) {
        for sensor_id in self.machine.sensor_ids() {
            match self.poller.read(&sensor_id).await {
                Ok(Some(status)) => {
                    self.machine.hydrate(&sensor_id, status).await;
                    tracing::info!(sensor_id = %sensor_id, %status, "Restored sensor state");
                }
                Ok(None) => {
                    tracing::debug!(sensor_id = %sensor_id, "No stored status, starting Online");
                }
                Err(e) => {
                    tracing::warn!(sensor_id = %sensor_id, error = %e, "Stored status unreadable, starting Online");
                }
            }
        }
        let states = self.machine.snapshot().await;
        self.outputs.render(&states).await;
    }

    /// Drive one sensor's state machine with `trigger`, persisting the
    /// transition when the trigger is a local one.
    pub async fn apply_trigger(&self, sensor_id: &str, trigger: Trigger) -> TriggerOutcome {
        let transition = match self.machine.begin(sensor_id, trigger).await {
            Admission::Started(transition) => transition,
            Admission::Busy => {
                tracing::debug!(sensor_id, %trigger, "Transition in flight, trigger dropped");
                return TriggerOutcome::Busy;
            }
            Admission::Ignored(state) => {
                tracing::debug!(sensor_id, %trigger, %state, "Trigger does not apply");
                return TriggerOutcome::Ignored(state);
            }
            Admission::UnknownSensor => {
                tracing::warn!(sensor_id, %trigger, "Trigger for unconfigured sensor");
                return TriggerOutcome::UnknownSensor;
            }
        };

        if let Some((event_type, actor)) = trigger.recorded_event() {
            if let Err(e) = self.orchestrator.apply(sensor_id, event_type, actor).await {
                self.machine.revert(&transition).await;
                tracing::error!(
                    sensor_id,
                    %trigger,
                    error = %e,
                    "Transition not persisted, state reverted"
                );
                return TriggerOutcome::Failed;
            }
        }

        self.machine.commit(&transition).await;
        tracing::info!(
            sensor_id,
            from = %transition.from,
            to = %transition.to,
            %trigger,
            "Sensor transitioned"
        );

        if trigger == Trigger::RebootCompleted {
            self.outputs.chime();
        }
        let states = self.machine.snapshot().await;
        self.outputs.render(&states).await;
        TriggerOutcome::Applied(transition.to)
    }

    /// Handle a debounced button press.
    pub async fn handle_press(&self, sensor_id: &str) -> TriggerOutcome {
        self.apply_trigger(sensor_id, Trigger::ButtonPress).await
    }

    /// Poll one sensor and act on the outcome. An adopted remote reboot is
    /// completed right away.
    pub async fn poll_sensor(&self, sensor_id: &str) -> PollOutcome {
        let outcome = self.poller.check(&self.machine, sensor_id).await;
        if let PollOutcome::Trigger(trigger) = outcome {
            let applied = self.apply_trigger(sensor_id, trigger).await;
            if trigger == Trigger::RemoteReboot && matches!(applied, TriggerOutcome::Applied(_)) {
                self.apply_trigger(sensor_id, Trigger::RebootCompleted).await;
            }
        }
        outcome
    }

    /// Poll every sensor once.
    pub async fn poll_once(&self) {
        for sensor_id in self.machine.sensor_ids() {
            self.poll_sensor(&sensor_id).await;
        }
    }

    /// Hydrate, then run the input, press, and poll loops until `shutdown`
    /// changes. Outputs are reset before returning.
    pub async fn run(&self, inputs: &dyn InputLines, shutdown: watch::Receiver<bool>) {
        self.hydrate().await;
        tracing::info!(
            sensors = ?self.machine.sensor_ids(),
            sample_ms = self.config.sample_interval_ms,
            poll_ms = self.config.poll_interval_ms,
            "Agent loops starting"
        );

        let (edge_tx, edge_rx) = mpsc::channel(EDGE_CHANNEL_CAPACITY);
        tokio::join!(
            self.input_loop(inputs, edge_tx, shutdown.clone()),
            self.press_loop(edge_rx, shutdown.clone()),
            self.poll_loop(shutdown),
        );

        self.outputs.shutdown().await;
        tracing::info!("Agent loops stopped");
    }

    async fn input_loop(
        &self,
        inputs: &dyn InputLines,
        edges: mpsc::Sender<String>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut debouncer = Debouncer::new(&self.config.sensors, self.config.debounce_samples);
        let pins: Vec<u32> = debouncer.pins().collect();
        let mut ticker = tokio::time::interval(self.config.sample_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }
            for &pin in &pins {
                let high = match inputs.read_level(pin) {
                    Ok(high) => high,
                    Err(e) => {
                        tracing::warn!(pin, error = %e, "Input read failed");
                        continue;
                    }
                };
                let Some(sensor_id) = debouncer.observe(pin, high).map(str::to_owned) else {
                    continue;
                };
                tracing::info!(sensor_id = %sensor_id, pin, "Button press detected");
                if edges.send(sensor_id).await.is_err() {
                    return;
                }
            }
        }
        tracing::debug!("Input loop stopped");
    }

    async fn press_loop(
        &self,
        mut edges: mpsc::Receiver<String>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            let sensor_id = tokio::select! {
                _ = shutdown.changed() => break,
                edge = edges.recv() => match edge {
                    Some(sensor_id) => sensor_id,
                    None => break,
                },
            };
            self.handle_press(&sensor_id).await;
        }
        tracing::debug!("Press loop stopped");
    }

    async fn poll_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }
            self.poll_once().await;
        }
        tracing::debug!("Poll loop stopped");
    }
}
