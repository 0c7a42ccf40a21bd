//! Messages emitted by device clients

use crate::state::DeviceState;

/// What a device client observed
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// First successful poll; state was unknown until now
    Baseline(DeviceState),

    /// The receiver's volume changed outside a suppression window
    VolumeChanged { previous: f32, volume: f32 },

    /// The receiver's mute state changed outside a suppression window
    MuteChanged { muted: bool },

    /// A poll failed; cached state was left as it was
    Error {
        message: String,
        /// True when the receiver could not be reached at all
        unreachable: bool,
    },
}

/// A `DeviceEvent` tagged with the client that produced it
///
/// `generation` identifies the configuration the client was built for, so
/// receivers of the message can discard anything from a torn-down client.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceMessage {
    pub index: usize,
    pub generation: u64,
    pub event: DeviceEvent,
}
