//! # avr-device
//!
//! One `DeviceClient` per receiver. The client sends commands, keeps the
//! last polled `DeviceState` and reports what changed between polls as
//! `DeviceMessage`s on a channel handed in at construction.
//!
//! Change reports can be held back for a short suppression window after a
//! command, so the receiver settling on a value the bridge itself asked for
//! is not mistaken for someone turning the knob.

mod client;
mod error;
mod event;
mod polling;
mod state;

pub use client::DeviceClient;
pub use error::{DeviceError, Result};
pub use event::{DeviceEvent, DeviceMessage};
pub use polling::{DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
pub use state::{DeviceState, PollStats};
