//! In-memory receiver for tests
//!
//! Behaves like a receiver with a fixed step size: `MVUP`/`MVDN` move the
//! volume by half a step, `MV{level}` sets it (subject to an optional
//! ceiling), mute commands flip the mute flag. Failures can be switched on
//! per operation.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::api::{ReceiverApi, ReceiverConnector};
use crate::command::Command;
use crate::endpoint::ReceiverEndpoint;
use crate::error::{ApiError, Result};
use crate::status::ReceiverStatus;
use crate::volume::clamp_display;

/// Step applied by `MVUP`/`MVDN`
pub const MOCK_STEP: f32 = 0.5;

#[derive(Debug, Clone, Default)]
pub struct MockReceiver {
    inner: Arc<MockInner>,
}

#[derive(Debug)]
struct MockInner {
    status: Mutex<ReceiverStatus>,
    commands: Mutex<Vec<Command>>,
    status_queries: AtomicUsize,
    fail_commands: AtomicBool,
    fail_status: AtomicBool,
    volume_ceiling: Mutex<Option<f32>>,
}

impl Default for MockInner {
    fn default() -> Self {
        Self {
            status: Mutex::new(ReceiverStatus {
                volume_display: 30.0,
                muted: false,
                power_on: true,
            }),
            commands: Mutex::new(Vec::new()),
            status_queries: AtomicUsize::new(0),
            fail_commands: AtomicBool::new(false),
            fail_status: AtomicBool::new(false),
            volume_ceiling: Mutex::new(None),
        }
    }
}

impl MockReceiver {
    /// Powered-on receiver at volume 30, unmuted
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_volume(volume: f32) -> Self {
        let mock = Self::new();
        mock.set_volume(volume);
        mock
    }

    /// Change the volume as if someone turned the knob
    pub fn set_volume(&self, volume: f32) {
        self.inner.status.lock().volume_display = clamp_display(volume);
    }

    pub fn set_muted(&self, muted: bool) {
        self.inner.status.lock().muted = muted;
    }

    /// Cap absolute volume commands, like a receiver volume limit
    pub fn set_volume_ceiling(&self, ceiling: Option<f32>) {
        *self.inner.volume_ceiling.lock() = ceiling;
    }

    pub fn set_fail_commands(&self, should_fail: bool) {
        self.inner.fail_commands.store(should_fail, Ordering::SeqCst);
    }

    pub fn set_fail_status(&self, should_fail: bool) {
        self.inner.fail_status.store(should_fail, Ordering::SeqCst);
    }

    pub fn current(&self) -> ReceiverStatus {
        *self.inner.status.lock()
    }

    /// Commands received so far, in order (failed attempts included)
    pub fn commands(&self) -> Vec<Command> {
        self.inner.commands.lock().clone()
    }

    pub fn status_queries(&self) -> usize {
        self.inner.status_queries.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.inner.commands.lock().clear();
        self.inner.status_queries.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReceiverApi for MockReceiver {
    async fn send(&self, command: &Command) -> Result<()> {
        self.inner.commands.lock().push(*command);

        if self.inner.fail_commands.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("mock receiver unreachable".to_string()));
        }

        let ceiling = *self.inner.volume_ceiling.lock();
        let mut status = self.inner.status.lock();
        match command {
            Command::VolumeUp => {
                status.volume_display = clamp_display(status.volume_display + MOCK_STEP)
            }
            Command::VolumeDown => {
                status.volume_display = clamp_display(status.volume_display - MOCK_STEP)
            }
            Command::SetVolume(target) => {
                let target = ceiling.map_or(*target, |c| target.min(c));
                status.volume_display = clamp_display(target);
            }
            Command::MuteOn => status.muted = true,
            Command::MuteOff => status.muted = false,
        }
        Ok(())
    }

    async fn status(&self) -> Result<ReceiverStatus> {
        self.inner.status_queries.fetch_add(1, Ordering::SeqCst);

        if self.inner.fail_status.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("mock receiver unreachable".to_string()));
        }
        Ok(self.current())
    }
}

/// Connector handing out pre-registered mock receivers by address
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    receivers: Arc<Mutex<Vec<(String, MockReceiver)>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the mock answering for `address`
    pub fn insert(&self, address: &str, receiver: MockReceiver) {
        let mut receivers = self.receivers.lock();
        receivers.retain(|(a, _)| a != address);
        receivers.push((address.to_string(), receiver));
    }

    /// Mock for `address`, created on first use
    pub fn receiver(&self, address: &str) -> MockReceiver {
        let mut receivers = self.receivers.lock();
        if let Some((_, receiver)) = receivers.iter().find(|(a, _)| a == address) {
            return receiver.clone();
        }
        let receiver = MockReceiver::new();
        receivers.push((address.to_string(), receiver.clone()));
        receiver
    }
}

impl ReceiverConnector for MockConnector {
    fn connect(&self, endpoint: &ReceiverEndpoint) -> Arc<dyn ReceiverApi> {
        Arc::new(self.receiver(endpoint.address()))
    }
}
