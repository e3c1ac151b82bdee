//! Aggregate indicator and ambient-pattern control.
//!
//! The indicator shows one view for the whole device, derived from every
//! sensor's state: normal (green, ambient pattern playing) when all are
//! `Online`, otherwise the fault view for the sensors that are not. A
//! sensor in `Rebooting` still counts as faulted until its completion is
//! recorded.

use std::collections::BTreeMap;
use std::sync::Arc;

use pisensor_types::SensorStatus;
use tokio::sync::Mutex;

use crate::capability::{AmbientPattern, Indicator};

/// What the outputs currently show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputView {
    /// Every sensor is `Online`.
    Normal,
    /// These sensors are not `Online`, in id order.
    Fault(Vec<String>),
}

impl OutputView {
    /// View for a set of sensor states.
    pub fn from_states(states: &BTreeMap<String, SensorStatus>) -> Self {
        let faulted: Vec<String> = states
            .iter()
            .filter(|(_, status)| **status != SensorStatus::Online)
            .map(|(id, _)| id.clone())
            .collect();
        if faulted.is_empty() {
            Self::Normal
        } else {
            Self::Fault(faulted)
        }
    }
}

/// Drives the indicator and the ambient pattern.
pub struct Outputs {
    indicator: Arc<dyn Indicator>,
    ambient: Arc<dyn AmbientPattern>,
    shown: Mutex<Option<OutputView>>,
}

impl Outputs {
    /// Wrap the output capabilities. Nothing is shown until the first
    /// [`Outputs::render`].
    pub fn new(indicator: Arc<dyn Indicator>, ambient: Arc<dyn AmbientPattern>) -> Self {
        Self {
            indicator,
            ambient,
            shown: Mutex::new(None),
        }
    }

    /// Show the view for `states` if it differs from what is shown.
    /// Returns the view now wanted, even if the indicator write failed.
    pub async fn render(&self, states: &BTreeMap<String, SensorStatus>) -> OutputView {
        let view = OutputView::from_states(states);
        let mut shown = self.shown.lock().await;
        if shown.as_ref() == Some(&view) {
            return view;
        }

        let result = match &view {
            OutputView::Normal => {
                let result = self.indicator.set_normal();
                self.ambient.start();
                result
            }
            OutputView::Fault(sensors) => {
                self.ambient.stop();
                match sensors.as_slice() {
                    [single] => self.indicator.set_error_for_sensor(single),
                    many => self.indicator.set_error_for_sensors(many),
                }
            }
        };
        // A failed write leaves nothing recorded so the next render retries.
        *shown = match result {
            Ok(()) => {
                tracing::debug!(?view, "Outputs updated");
                Some(view.clone())
            }
            Err(e) => {
                tracing::error!(error = %e, ?view, "Failed to update indicator");
                None
            }
        };
        view
    }

    /// Play the reboot-completed acknowledgement.
    pub fn chime(&self) {
        self.ambient.chime();
    }

    /// Silence the ambient pattern and switch the indicator off.
    pub async fn shutdown(&self) {
        self.ambient.silence();
        if let Err(e) = self.indicator.off() {
            tracing::error!(error = %e, "Failed to switch indicator off");
        }
        *self.shown.lock().await = None;
        tracing::info!("Outputs reset");
    }
}
