//! Inbound requests and outbound state exchanged with the host platform

use avr_device::DeviceState;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// How a volume request's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeMode {
    /// Value is the target in display units
    Absolute,
    /// Value is added to the current volume
    Relative,
    /// Only the sign matters: one receiver step up or down
    RelativeStep,
}

/// Volume change requested by the control surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeRequest {
    pub mode: VolumeMode,
    pub value: f32,
}

impl VolumeRequest {
    pub fn absolute(value: f32) -> Self {
        Self {
            mode: VolumeMode::Absolute,
            value,
        }
    }

    pub fn relative(delta: f32) -> Self {
        Self {
            mode: VolumeMode::Relative,
            value: delta,
        }
    }

    pub fn step(delta: f32) -> Self {
        Self {
            mode: VolumeMode::RelativeStep,
            value: delta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MuteAction {
    Mute,
    Unmute,
}

impl MuteAction {
    pub fn is_mute(self) -> bool {
        matches!(self, MuteAction::Mute)
    }
}

/// A debounced volume request waiting for its window to elapse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingCommand {
    pub mode: VolumeMode,
    pub value: f32,
    pub scheduled_at: Instant,
}

impl PendingCommand {
    pub fn new(request: VolumeRequest) -> Self {
        Self {
            mode: request.mode,
            value: request.value,
            scheduled_at: Instant::now(),
        }
    }
}

/// Where a receiver is in its request cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverPhase {
    Idle,
    Debouncing,
    Committing,
}

/// State object published to the host for one receiver
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HostVolumeState {
    pub volume_value: f32,
    pub is_muted: bool,
}

impl From<DeviceState> for HostVolumeState {
    fn from(state: DeviceState) -> Self {
        Self {
            volume_value: state.volume_display,
            is_muted: state.muted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_names() {
        let request: VolumeRequest =
            serde_json::from_str(r#"{"mode": "relative_step", "value": -1}"#).unwrap();
        assert_eq!(request, VolumeRequest::step(-1.0));

        let action: MuteAction = serde_json::from_str("\"unmute\"").unwrap();
        assert_eq!(action, MuteAction::Unmute);
        assert!(MuteAction::Mute.is_mute());
    }

    #[test]
    fn test_host_state_serializes_field_names() {
        let json = serde_json::to_value(HostVolumeState {
            volume_value: 45.5,
            is_muted: true,
        })
        .unwrap();
        assert_eq!(json["volume_value"], 45.5);
        assert_eq!(json["is_muted"], true);
    }
}
