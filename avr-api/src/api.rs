//! Receiver API seam
//!
//! `ReceiverApi` is what the device layer talks to. The HTTP implementation
//! is the only one used in production; tests substitute an in-memory
//! receiver (see the `test-support` feature).

use std::sync::Arc;

use async_trait::async_trait;
use http_client::HttpClient;

use crate::command::Command;
use crate::endpoint::ReceiverEndpoint;
use crate::error::{ApiError, Result};
use crate::status::ReceiverStatus;

/// Operations a single receiver supports
#[async_trait]
pub trait ReceiverApi: Send + Sync {
    /// Send one command; succeeds on any 2xx answer
    async fn send(&self, command: &Command) -> Result<()>;

    /// Query and parse the main zone status
    async fn status(&self) -> Result<ReceiverStatus>;
}

/// Builds a `ReceiverApi` for an endpoint
pub trait ReceiverConnector: Send + Sync {
    fn connect(&self, endpoint: &ReceiverEndpoint) -> Arc<dyn ReceiverApi>;
}

/// `ReceiverApi` over the goform HTTP interface
#[derive(Debug, Clone)]
pub struct HttpReceiverApi {
    endpoint: ReceiverEndpoint,
    http: HttpClient,
}

impl HttpReceiverApi {
    /// Create an API handle using the shared HTTP client
    pub fn new(endpoint: ReceiverEndpoint) -> Self {
        Self::with_http_client(endpoint, HttpClient::get().clone())
    }

    pub fn with_http_client(endpoint: ReceiverEndpoint, http: HttpClient) -> Self {
        Self { endpoint, http }
    }

    pub fn endpoint(&self) -> &ReceiverEndpoint {
        &self.endpoint
    }
}

#[async_trait]
impl ReceiverApi for HttpReceiverApi {
    async fn send(&self, command: &Command) -> Result<()> {
        if let Command::SetVolume(value) = command {
            if !value.is_finite() {
                return Err(ApiError::InvalidParameter(format!(
                    "volume {} is not a finite number",
                    value
                )));
            }
        }

        let url = self.endpoint.command_url(command);
        tracing::debug!("Sending {} to {}", command, self.endpoint);
        self.http.get_text(&url).await?;
        Ok(())
    }

    async fn status(&self) -> Result<ReceiverStatus> {
        let body = self.http.get_text(&self.endpoint.status_url()).await?;
        ReceiverStatus::from_xml(&body)
    }
}

/// Connector producing `HttpReceiverApi` handles that share one client
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    http: HttpClient,
}

impl HttpConnector {
    pub fn new() -> Self {
        Self {
            http: HttpClient::get().clone(),
        }
    }

    pub fn with_http_client(http: HttpClient) -> Self {
        Self { http }
    }
}

impl ReceiverConnector for HttpConnector {
    fn connect(&self, endpoint: &ReceiverEndpoint) -> Arc<dyn ReceiverApi> {
        Arc::new(HttpReceiverApi::with_http_client(
            endpoint.clone(),
            self.http.clone(),
        ))
    }
}
