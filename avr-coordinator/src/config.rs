//! Coordinator timing and receiver list configuration

use std::time::Duration;

use avr_api::ReceiverEndpoint;
use serde::{Deserialize, Serialize};

use crate::error::{CoordinatorError, Result};

/// Timing knobs for the coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Quiet period before a volume request is sent; newer requests replace it
    /// Default: 200 ms
    pub debounce_window: Duration,

    /// How long after a command polled changes are not reported upward
    /// Default: 1 second
    pub suppression_window: Duration,

    /// Delay before the poll that confirms an absolute/relative/mute command
    /// Default: 1 second
    pub confirmation_delay: Duration,

    /// Delay before the poll that reads back a stepped change
    /// Default: 500 ms
    pub step_poll_delay: Duration,

    /// Regular status poll interval
    /// Default: 5 seconds
    pub poll_interval: Duration,

    /// Largest receiver list accepted
    /// Default: 4
    pub max_receivers: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_millis(200),
            suppression_window: Duration::from_secs(1),
            confirmation_delay: Duration::from_secs(1),
            step_poll_delay: Duration::from_millis(500),
            poll_interval: avr_device::DEFAULT_POLL_INTERVAL,
            max_receivers: 4,
        }
    }
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tighter timings for receivers on a fast, quiet network
    pub fn responsive() -> Self {
        Self {
            debounce_window: Duration::from_millis(100),
            suppression_window: Duration::from_millis(600),
            confirmation_delay: Duration::from_millis(600),
            step_poll_delay: Duration::from_millis(300),
            poll_interval: Duration::from_secs(2),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("debounce_window", self.debounce_window),
            ("suppression_window", self.suppression_window),
            ("confirmation_delay", self.confirmation_delay),
            ("step_poll_delay", self.step_poll_delay),
            ("poll_interval", self.poll_interval),
        ];
        for (name, value) in durations {
            if value.is_zero() {
                return Err(CoordinatorError::Configuration(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        // The confirming poll has to land outside the suppression window
        if self.confirmation_delay < self.suppression_window {
            return Err(CoordinatorError::Configuration(
                "confirmation_delay must not be shorter than suppression_window".to_string(),
            ));
        }

        if self.max_receivers == 0 {
            return Err(CoordinatorError::Configuration(
                "max_receivers must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Receiver list as supplied by the host's configuration store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSettings {
    pub receivers: Vec<ReceiverEndpoint>,
}

impl BridgeSettings {
    pub fn new(receivers: Vec<ReceiverEndpoint>) -> Self {
        Self { receivers }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CoordinatorError::Configuration(format!("invalid settings: {}", e)))
    }

    /// Check list length (1 to `max_receivers`) and every endpoint
    pub fn validate(&self, max_receivers: usize) -> Result<()> {
        validate_receivers(&self.receivers, max_receivers)
    }
}

pub(crate) fn validate_receivers(receivers: &[ReceiverEndpoint], max_receivers: usize) -> Result<()> {
    if receivers.is_empty() {
        return Err(CoordinatorError::Configuration(
            "no receivers configured".to_string(),
        ));
    }
    if receivers.len() > max_receivers {
        return Err(CoordinatorError::Configuration(format!(
            "{} receivers configured, at most {} supported",
            receivers.len(),
            max_receivers
        )));
    }
    for (index, endpoint) in receivers.iter().enumerate() {
        endpoint.validate().map_err(|e| {
            CoordinatorError::Configuration(format!("receiver {}: {}", index, e))
        })?;
    }
    Ok(())
}
