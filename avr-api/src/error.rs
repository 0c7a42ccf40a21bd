use http_client::HttpError;
use thiserror::Error;

/// Errors returned by receiver API calls
///
/// The variants follow the failure taxonomy the rest of the bridge reasons
/// about: the receiver could not be reached, it answered with something we
/// cannot use, or the caller asked for something invalid before any request
/// was made.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Timeout, refused connection or other network-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status or an unparsable status document
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid parameter value (non-finite volume, bad endpoint, ...)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ApiError {
    /// Whether the failure happened below HTTP (receiver unreachable)
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<HttpError> for ApiError {
    fn from(error: HttpError) -> Self {
        match error {
            HttpError::Transport(msg) => ApiError::Transport(msg),
            HttpError::Status(code) => ApiError::Protocol(format!("HTTP status {}", code)),
            HttpError::Body(msg) => ApiError::Protocol(format!("unreadable body: {}", msg)),
        }
    }
}
