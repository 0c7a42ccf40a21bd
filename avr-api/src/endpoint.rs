//! Receiver endpoint addressing

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{ApiError, Result};

/// Port the goform web interface listens on unless configured otherwise
pub const DEFAULT_PORT: u16 = 8080;

/// Path of the command endpoint; the command token is the whole query string
pub const COMMAND_PATH: &str = "/goform/formiPhoneAppDirect.xml";

/// Path of the main zone status document
pub const STATUS_PATH: &str = "/goform/formMainZone_MainZoneXmlStatusLite.xml";

/// Network location and display name of one receiver
///
/// Endpoints are immutable. A configuration change produces a new list of
/// endpoints rather than editing existing ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverEndpoint {
    address: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    label: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ReceiverEndpoint {
    pub fn new(address: impl Into<String>, port: u16, label: impl Into<String>) -> Self {
        Self {
            address: address.into().trim().to_string(),
            port,
            label: label.into(),
        }
    }

    /// Endpoint on the default port, labelled with its address
    pub fn with_address(address: impl Into<String>) -> Self {
        Self::new(address, DEFAULT_PORT, "")
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Display name, falling back to the address when none was configured
    pub fn label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.address
        } else {
            &self.label
        }
    }

    /// Check that the endpoint can be turned into a request URL
    ///
    /// Accepts a hostname or dotted IPv4 address without scheme, port or
    /// path, and any port except 0.
    pub fn validate(&self) -> Result<()> {
        let address = self.address.as_str();
        if address.trim().is_empty() {
            return Err(ApiError::InvalidParameter(
                "receiver address is empty".to_string(),
            ));
        }

        let valid_chars = address
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_');
        if !valid_chars || address.starts_with('.') || address.starts_with('-') {
            return Err(ApiError::InvalidParameter(format!(
                "receiver address '{}' is not a hostname or IPv4 address",
                address
            )));
        }

        if self.port == 0 {
            return Err(ApiError::InvalidParameter(format!(
                "receiver '{}' has port 0",
                address
            )));
        }

        Ok(())
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }

    pub fn command_url(&self, command: &Command) -> String {
        format!("{}{}?{}", self.base_url(), COMMAND_PATH, command.token())
    }

    pub fn status_url(&self) -> String {
        format!("{}{}", self.base_url(), STATUS_PATH)
    }
}

impl fmt::Display for ReceiverEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.label(), self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_urls() {
        let endpoint = ReceiverEndpoint::new("192.168.1.40", 8080, "Living Room");
        assert_eq!(
            endpoint.command_url(&Command::SetVolume(50.5)),
            "http://192.168.1.40:8080/goform/formiPhoneAppDirect.xml?MV505"
        );
        assert_eq!(
            endpoint.status_url(),
            "http://192.168.1.40:8080/goform/formMainZone_MainZoneXmlStatusLite.xml"
        );
    }

    #[test]
    fn test_label_falls_back_to_address() {
        let endpoint = ReceiverEndpoint::with_address("denon.local");
        assert_eq!(endpoint.label(), "denon.local");
        assert_eq!(endpoint.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let endpoint: ReceiverEndpoint =
            serde_json::from_str(r#"{"address": "10.0.0.7"}"#).unwrap();
        assert_eq!(endpoint.port(), 8080);
        assert_eq!(endpoint.label(), "10.0.0.7");
    }

    #[rstest]
    #[case("192.168.1.40", 8080)]
    #[case("avr-den.local", 80)]
    #[case("receiver", 65535)]
    fn test_validate_accepts(#[case] address: &str, #[case] port: u16) {
        assert!(ReceiverEndpoint::new(address, port, "").validate().is_ok());
    }

    #[rstest]
    #[case("", 8080)]
    #[case("   ", 8080)]
    #[case("http://192.168.1.40", 8080)]
    #[case("192.168.1.40:8080", 8080)]
    #[case("10.0.0.1/goform", 8080)]
    #[case("my receiver", 8080)]
    #[case("192.168.1.40", 0)]
    fn test_validate_rejects(#[case] address: &str, #[case] port: u16) {
        let result = ReceiverEndpoint::new(address, port, "").validate();
        assert!(matches!(result, Err(ApiError::InvalidParameter(_))));
    }

    #[rstest]
    #[case(r#"{"address": " 10.0.0.7 "}"#)]
    #[case(r#"{"address": "10.0.0.7\n"}"#)]
    #[case(r#"{"address": ""}"#)]
    #[case(r#"{"address": "10.0.0.7", "port": 0}"#)]
    fn test_validate_rejects_deserialized(#[case] json: &str) {
        let endpoint: ReceiverEndpoint = serde_json::from_str(json).unwrap();
        assert!(matches!(
            endpoint.validate(),
            Err(ApiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_constructor_trims_address() {
        let endpoint = ReceiverEndpoint::new(" 10.0.0.7 ", 8080, "");
        assert_eq!(endpoint.address(), "10.0.0.7");
        assert!(endpoint.validate().is_ok());
        assert_eq!(endpoint.base_url(), "http://10.0.0.7:8080");
    }
}
