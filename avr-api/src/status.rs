//! Main zone status document parsing

use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::volume::parse_decibel;

/// Receiver state as reported by one status query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceiverStatus {
    /// Master volume in display units
    pub volume_display: f32,
    pub muted: bool,
    /// Main zone power; informational only
    pub power_on: bool,
}

impl ReceiverStatus {
    /// Parse the `formMainZone_MainZoneXmlStatusLite.xml` document
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document: StatusDocument = quick_xml::de::from_str(xml)
            .map_err(|e| ApiError::Protocol(format!("Failed to parse status XML: {}", e)))?;

        let volume = document
            .master_volume
            .ok_or_else(|| ApiError::Protocol("Missing MasterVolume element".to_string()))?;
        let mute = document
            .mute
            .ok_or_else(|| ApiError::Protocol("Missing Mute element".to_string()))?;

        Ok(Self {
            volume_display: parse_decibel(&volume.value)?,
            muted: mute.value.trim().eq_ignore_ascii_case("on"),
            power_on: document
                .power
                .map(|p| p.value.trim().eq_ignore_ascii_case("on"))
                .unwrap_or(false),
        })
    }
}

#[derive(Debug, Deserialize)]
struct StatusDocument {
    #[serde(rename = "Power")]
    power: Option<ValueField>,
    #[serde(rename = "MasterVolume")]
    master_volume: Option<ValueField>,
    #[serde(rename = "Mute")]
    mute: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    #[serde(default)]
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS_XML: &str = r#"<?xml version="1.0" encoding="utf-8" ?>
<item>
<Power><value>ON</value></Power>
<ZonePower><value>ON</value></ZonePower>
<InputFuncSelect><value>TV</value></InputFuncSelect>
<VolumeDisplay><value>Absolute</value></VolumeDisplay>
<MasterVolume><value>-30.5</value></MasterVolume>
<Mute><value>off</value></Mute>
</item>"#;

    #[test]
    fn test_parse_status() {
        let status = ReceiverStatus::from_xml(STATUS_XML).unwrap();
        assert_eq!(status.volume_display, 49.5);
        assert!(!status.muted);
        assert!(status.power_on);
    }

    #[test]
    fn test_parse_standby_muted_no_volume() {
        let xml = r#"<item>
<Power><value>STANDBY</value></Power>
<MasterVolume><value>--</value></MasterVolume>
<Mute><value>on</value></Mute>
</item>"#;
        let status = ReceiverStatus::from_xml(xml).unwrap();
        assert_eq!(status.volume_display, 0.0);
        assert!(status.muted);
        assert!(!status.power_on);
    }

    #[test]
    fn test_missing_master_volume() {
        let xml = "<item><Mute><value>off</value></Mute></item>";
        match ReceiverStatus::from_xml(xml) {
            Err(ApiError::Protocol(msg)) => assert!(msg.contains("MasterVolume")),
            other => panic!("Expected ApiError::Protocol, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_document() {
        let result = ReceiverStatus::from_xml("<item><MasterVolume><value>-30");
        assert!(matches!(result, Err(ApiError::Protocol(_))));
    }

    #[test]
    fn test_garbage_volume_is_protocol_error() {
        let xml = "<item><MasterVolume><value>max</value></MasterVolume><Mute><value>off</value></Mute></item>";
        assert!(matches!(
            ReceiverStatus::from_xml(xml),
            Err(ApiError::Protocol(_))
        ));
    }
}
