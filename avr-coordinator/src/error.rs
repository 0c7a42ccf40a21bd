use avr_device::DeviceError;
use thiserror::Error;

/// Errors surfaced by the volume coordinator
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Receiver list or coordinator settings are unusable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No live receiver at this index
    #[error("No receiver at index {0}")]
    UnknownReceiver(usize),

    /// The request itself is malformed (non-finite value, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A relative change was requested before the volume was ever read
    #[error("Volume of receiver {0} is not known yet")]
    StateUnknown(usize),

    /// The receiver rejected or never received a command
    #[error("Receiver {index}: {source}")]
    Device {
        index: usize,
        #[source]
        source: DeviceError,
    },

    /// A status poll failed
    #[error("Receiver {index} poll failed: {message}")]
    Poll { index: usize, message: String },
}

impl CoordinatorError {
    pub fn device(index: usize, source: DeviceError) -> Self {
        CoordinatorError::Device { index, source }
    }

    /// Index of the receiver the error concerns, if any
    pub fn receiver_index(&self) -> Option<usize> {
        match self {
            CoordinatorError::UnknownReceiver(index)
            | CoordinatorError::StateUnknown(index)
            | CoordinatorError::Device { index, .. }
            | CoordinatorError::Poll { index, .. } => Some(*index),
            CoordinatorError::Configuration(_) | CoordinatorError::InvalidRequest(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
