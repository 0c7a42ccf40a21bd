//! Volume unit conversions
//!
//! Two representations exist on the wire. Commands carry the display value
//! (`MV50`, `MV505`), the status document reports a decibel offset
//! (`-30.0`) where `display = decibel + 80`. Everything in the bridge is
//! kept in display units at half-step granularity.

use crate::error::{ApiError, Result};

/// Lowest display value
pub const MIN_DISPLAY: f32 = 0.0;

/// Highest display value (+18 dB)
pub const MAX_DISPLAY: f32 = 98.0;

/// Display zero sits at -80 dB
pub const DECIBEL_OFFSET: f32 = 80.0;

/// Token the status document reports when the volume is unavailable
pub const NO_VALUE: &str = "--";

/// Clamp to [0, 98] and round to the nearest half step
///
/// NaN maps to the minimum; infinities saturate.
pub fn clamp_display(value: f32) -> f32 {
    if value.is_nan() {
        return MIN_DISPLAY;
    }
    let clamped = value.clamp(MIN_DISPLAY, MAX_DISPLAY);
    (clamped * 2.0).round() / 2.0
}

/// Encode a display value as the `MV` command level
///
/// Whole values are sent as their digits, half steps as tenths padded to
/// three digits, so a token's length alone tells the two apart.
///
/// ```
/// use avr_api::volume::encode_level;
///
/// assert_eq!(encode_level(50.0), "50");
/// assert_eq!(encode_level(50.5), "505");
/// assert_eq!(encode_level(0.5), "005");
/// ```
pub fn encode_level(display: f32) -> String {
    let halves = (clamp_display(display) * 2.0).round() as u32;
    if halves % 2 == 0 {
        format!("{}", halves / 2)
    } else {
        format!("{:03}", halves * 5)
    }
}

/// Decode an `MV` command level back into a display value
pub fn decode_level(token: &str) -> Option<f32> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let raw: u32 = token.parse().ok()?;
    let value = match token.len() {
        1 | 2 => raw as f32,
        3 => raw as f32 / 10.0,
        _ => return None,
    };

    if value > MAX_DISPLAY {
        return None;
    }
    Some(clamp_display(value))
}

pub fn display_to_decibel(display: f32) -> f32 {
    display - DECIBEL_OFFSET
}

pub fn decibel_to_display(decibel: f32) -> f32 {
    decibel + DECIBEL_OFFSET
}

/// Parse the `MasterVolume` value of a status document into display units
///
/// The no-value marker (and an empty value) reads as volume 0.
pub fn parse_decibel(text: &str) -> Result<f32> {
    let text = text.trim();
    if text.is_empty() || text == NO_VALUE {
        return Ok(MIN_DISPLAY);
    }

    let decibel: f32 = text
        .parse()
        .map_err(|_| ApiError::Protocol(format!("invalid MasterVolume value '{}'", text)))?;

    if !decibel.is_finite() {
        return Err(ApiError::Protocol(format!(
            "invalid MasterVolume value '{}'",
            text
        )));
    }

    Ok(clamp_display(decibel_to_display(decibel)))
}
