//! # avr-coordinator
//!
//! Bridges a home-audio control surface to one to four AV receivers.
//!
//! The host hands the `VolumeCoordinator` volume requests (absolute,
//! relative or stepped) and mute actions per receiver index, and receives
//! `{volume_value, is_muted}` updates through its `StateSink`. In between,
//! the coordinator debounces bursts of requests, publishes the expected
//! result of a command right away and corrects it from polled receiver
//! state.
//!
//! Each reconfiguration is a new generation: clients, timers and messages
//! of older generations are cancelled or ignored.

mod config;
mod coordinator;
mod error;
pub mod logging;
mod request;
mod sink;
mod slot;

pub use config::{BridgeSettings, CoordinatorConfig};
pub use coordinator::VolumeCoordinator;
pub use error::{CoordinatorError, Result};
pub use request::{
    HostVolumeState, MuteAction, PendingCommand, ReceiverPhase, VolumeMode, VolumeRequest,
};
pub use sink::{NullSink, StateSink};
