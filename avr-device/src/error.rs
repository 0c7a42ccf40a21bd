use avr_api::ApiError;
use thiserror::Error;

/// Errors returned by device client commands
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The receiver rejected the command or could not be reached
    #[error("Command {command} failed: {source}")]
    Command {
        command: String,
        #[source]
        source: ApiError,
    },

    /// The requested volume is not a number
    #[error("Invalid volume target: {0}")]
    InvalidVolume(f32),

    /// The client was destroyed; it no longer talks to the receiver
    #[error("Device client has been destroyed")]
    Destroyed,
}

impl DeviceError {
    /// Whether the failure was the receiver being unreachable
    pub fn is_transport(&self) -> bool {
        matches!(self, DeviceError::Command { source, .. } if source.is_transport())
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;
