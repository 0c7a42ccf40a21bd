//! Error types for the HTTP client

use thiserror::Error;

/// Errors that can occur while talking to a receiver over HTTP
#[derive(Debug, Error)]
pub enum HttpError {
    /// Connection failure, DNS failure or request timeout
    #[error("Transport error: {0}")]
    Transport(String),

    /// The receiver answered with a non-success status code
    #[error("HTTP status {0}")]
    Status(u16),

    /// The response body could not be read
    #[error("Body error: {0}")]
    Body(String),
}
