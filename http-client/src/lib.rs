//! Private HTTP client for AV receiver communication
//!
//! Receivers with the legacy "goform" API answer plain, unauthenticated
//! HTTP GET requests. This crate wraps a shared `reqwest` client with the
//! fixed request timeout the rest of the bridge relies on.

mod error;

pub use error::HttpError;

use std::sync::OnceLock;
use std::time::Duration;

/// Upper bound for a single request, connect included
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

static SHARED_CLIENT: OnceLock<HttpClient> = OnceLock::new();

/// A minimal async HTTP client for receiver requests
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a new client with the default request timeout
    pub fn new() -> Self {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client configuration: {}", e);
                reqwest::Client::new()
            });

        Self::from_client(inner, timeout)
    }

    /// The timeout is applied per request, so it holds whatever `inner` was
    /// built with
    fn from_client(inner: reqwest::Client, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Process-wide client instance
    ///
    /// All receivers share one connection pool. The receivers themselves
    /// only accept a single connection at a time, so pooling mostly saves
    /// the TCP handshake between polls.
    pub fn get() -> &'static HttpClient {
        SHARED_CLIENT.get_or_init(HttpClient::new)
    }

    /// Send a GET request and return the response body
    pub async fn get_text(&self, url: &str) -> Result<String, HttpError> {
        tracing::trace!("GET {}", url);

        let response = self
            .inner
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| HttpError::Transport(describe(&e, self.timeout)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| HttpError::Body(e.to_string()))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(error: &reqwest::Error, timeout: Duration) -> String {
    if error.is_timeout() {
        format!("request timed out after {:?}: {}", timeout, error)
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let _client = HttpClient::new();
        let _default_client = HttpClient::default();
        let _custom = HttpClient::with_timeout(Duration::from_millis(250));
    }

    #[test]
    fn test_shared_client_is_singleton() {
        let a = HttpClient::get() as *const HttpClient;
        let b = HttpClient::get() as *const HttpClient;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_get_text_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/goform/formMainZone_MainZoneXmlStatusLite.xml")
            .with_status(200)
            .with_body("<item></item>")
            .create_async()
            .await;

        let url = format!(
            "{}/goform/formMainZone_MainZoneXmlStatusLite.xml",
            server.url()
        );
        let body = HttpClient::new().get_text(&url).await.unwrap();

        assert_eq!(body, "<item></item>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/goform/formiPhoneAppDirect.xml")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let url = format!("{}/goform/formiPhoneAppDirect.xml?MVUP", server.url());
        match HttpClient::new().get_text(&url).await {
            Err(HttpError::Status(code)) => assert_eq!(code, 500),
            other => panic!("Expected HttpError::Status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let client = HttpClient::with_timeout(Duration::from_millis(500));
        let result = client.get_text("http://127.0.0.1:1/goform/x.xml").await;
        assert!(matches!(result, Err(HttpError::Transport(_))));
    }

    #[tokio::test]
    async fn test_fallback_client_keeps_request_timeout() {
        // Accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/goform/x.xml", listener.local_addr().unwrap());

        let client = HttpClient::from_client(reqwest::Client::new(), Duration::from_millis(200));
        assert_eq!(client.timeout(), Duration::from_millis(200));

        let result = tokio::time::timeout(Duration::from_secs(5), client.get_text(&url))
            .await
            .expect("request was not bounded by the client timeout");
        match result {
            Err(HttpError::Transport(msg)) => assert!(msg.contains("timed out"), "{}", msg),
            other => panic!("Expected HttpError::Transport, got {:?}", other),
        }
        drop(listener);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(HttpError::Status(404).to_string(), "HTTP status 404");
        assert_eq!(
            HttpError::Transport("connection failed".to_string()).to_string(),
            "Transport error: connection failed"
        );
    }
}
