//! # avr-api
//!
//! Typed access to AV receivers that expose the legacy "goform" HTTP
//! interface: the main zone command endpoint (`MVUP`, `MV505`, `MUON`, ...)
//! and the XML status document.
//!
//! The crate is stateless. It knows how to address a receiver, how to encode
//! commands and how to read status back; caching, polling and change
//! detection live in the device layer above it.
//!
//! ```rust,no_run
//! use avr_api::{Command, HttpReceiverApi, ReceiverApi, ReceiverEndpoint};
//!
//! # async fn run() -> avr_api::Result<()> {
//! let api = HttpReceiverApi::new(ReceiverEndpoint::new("192.168.1.40", 8080, "Den"));
//! api.send(&Command::SetVolume(42.5)).await?;
//! let status = api.status().await?;
//! println!("volume {} muted {}", status.volume_display, status.muted);
//! # Ok(())
//! # }
//! ```

mod api;
mod command;
mod endpoint;
mod error;
mod status;
pub mod volume;

#[cfg(feature = "test-support")]
pub mod mock;

pub use api::{HttpConnector, HttpReceiverApi, ReceiverApi, ReceiverConnector};
pub use command::{Command, StepDirection};
pub use endpoint::{ReceiverEndpoint, COMMAND_PATH, DEFAULT_PORT, STATUS_PATH};
pub use error::{ApiError, Result};
pub use status::ReceiverStatus;
