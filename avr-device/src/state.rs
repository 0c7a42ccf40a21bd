use avr_api::ReceiverStatus;
use tokio::time::Instant;

/// Cached snapshot of one receiver, as of its last successful poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceState {
    /// Master volume in display units, [0, 98] in half steps
    pub volume_display: f32,
    pub muted: bool,
    /// Informational; power changes are not reported
    pub power_on: bool,
    pub last_polled_at: Instant,
}

impl DeviceState {
    pub fn from_status(status: ReceiverStatus, polled_at: Instant) -> Self {
        Self {
            volume_display: status.volume_display,
            muted: status.muted,
            power_on: status.power_on,
            last_polled_at: polled_at,
        }
    }
}

/// Counters for the poll path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub polls: u64,
    pub failures: u64,
    /// Failures since the last successful poll
    pub consecutive_failures: u32,
}
