//! VolumeCoordinator - entry point for the host platform
//!
//! The coordinator owns one slot per configured receiver. Volume requests
//! are debounced per slot, mute requests go straight through, and state
//! read back from the receivers is republished to the host's `StateSink`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use avr_api::{HttpConnector, ReceiverEndpoint};
//! use avr_coordinator::{CoordinatorConfig, NullSink, VolumeCoordinator, VolumeRequest};
//!
//! # async fn run() -> avr_coordinator::Result<()> {
//! let coordinator = VolumeCoordinator::new(
//!     CoordinatorConfig::default(),
//!     Arc::new(HttpConnector::new()),
//!     Arc::new(NullSink),
//! )?;
//! coordinator
//!     .update_settings(vec![ReceiverEndpoint::new("192.168.1.40", 8080, "Living Room")])
//!     .await?;
//!
//! coordinator.set_volume(0, VolumeRequest::absolute(45.0))?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use avr_api::{ReceiverConnector, ReceiverEndpoint};
use avr_device::{DeviceClient, DeviceEvent, DeviceMessage, DeviceState};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{validate_receivers, CoordinatorConfig};
use crate::error::{CoordinatorError, Result};
use crate::request::{
    HostVolumeState, MuteAction, PendingCommand, ReceiverPhase, VolumeRequest,
};
use crate::sink::StateSink;
use crate::slot::{ReceiverSlot, SlotContext};

/// Maps host volume requests onto receivers and keeps host state in sync
pub struct VolumeCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: CoordinatorConfig,
    connector: Arc<dyn ReceiverConnector>,
    sink: Arc<dyn StateSink>,
    generation: Arc<AtomicU64>,
    slots: RwLock<Vec<Arc<ReceiverSlot>>>,
    context: Mutex<Option<Arc<SlotContext>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl VolumeCoordinator {
    /// Create a coordinator with no receivers
    ///
    /// Call `update_settings` to build the receiver list.
    pub fn new(
        config: CoordinatorConfig,
        connector: Arc<dyn ReceiverConnector>,
        sink: Arc<dyn StateSink>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                connector,
                sink,
                generation: Arc::new(AtomicU64::new(0)),
                slots: RwLock::new(Vec::new()),
                context: Mutex::new(None),
                pump: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Replace the receiver list
    ///
    /// Everything belonging to the previous list is cancelled and destroyed
    /// before the new clients are built from index 0. An invalid list is
    /// rejected and the previous receivers keep running.
    pub async fn update_settings(&self, receivers: Vec<ReceiverEndpoint>) -> Result<()> {
        validate_receivers(&receivers, self.inner.config.max_receivers)?;

        let runtime = Handle::current();
        let mut slots = self.inner.slots.write();
        self.inner.teardown_locked(&mut slots);

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let context = Arc::new(SlotContext {
            config: self.inner.config.clone(),
            sink: Arc::clone(&self.inner.sink),
            generation: Arc::clone(&self.inner.generation),
            runtime: runtime.clone(),
        });

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        for (index, endpoint) in receivers.into_iter().enumerate() {
            let api = self.inner.connector.connect(&endpoint);
            tracing::info!("Receiver {}: {}", index, endpoint);
            let client = DeviceClient::new(index, generation, endpoint, api, event_tx.clone());
            slots.push(Arc::new(ReceiverSlot::new(client)));
        }
        drop(event_tx);

        *self.inner.context.lock() = Some(context);
        *self.inner.pump.lock() = Some(runtime.spawn(run_event_pump(
            Arc::downgrade(&self.inner),
            generation,
            event_rx,
        )));

        for slot in slots.iter() {
            slot.client().start_polling(self.inner.config.poll_interval);
        }

        tracing::info!(
            "Coordinator generation {} running with {} receiver(s)",
            generation,
            slots.len()
        );
        Ok(())
    }

    /// Queue a volume request; it is sent once the debounce window passes
    ///
    /// A later request for the same receiver inside the window replaces this
    /// one. Failures of the eventual command go to `StateSink::report_error`.
    pub fn set_volume(&self, index: usize, request: VolumeRequest) -> Result<()> {
        if !request.value.is_finite() {
            return Err(CoordinatorError::InvalidRequest(format!(
                "volume value {} is not a finite number",
                request.value
            )));
        }

        let slot = self.inner.live_slot(index)?;
        let context = self.inner.context()?;

        tracing::debug!(
            "Receiver {}: {:?} request {}",
            index,
            request.mode,
            request.value
        );
        slot.arm_debounce(&context, PendingCommand::new(request));
        Ok(())
    }

    /// Mute or unmute immediately
    pub async fn set_mute(&self, index: usize, action: MuteAction) -> Result<()> {
        let slot = self.inner.live_slot(index)?;
        let context = self.inner.context()?;

        tracing::debug!("Receiver {}: {:?} request", index, action);
        slot.commit_mute(&context, action.is_mute()).await
    }

    /// State last published to the host for `index`
    pub fn host_state(&self, index: usize) -> Option<HostVolumeState> {
        self.inner.slot(index).and_then(|slot| slot.host_state())
    }

    /// Cached receiver snapshot for `index`
    pub fn device_state(&self, index: usize) -> Option<DeviceState> {
        self.inner.slot(index).and_then(|slot| slot.client().state())
    }

    pub fn phase(&self, index: usize) -> Option<ReceiverPhase> {
        self.inner.slot(index).map(|slot| slot.phase())
    }

    pub fn pending(&self, index: usize) -> Option<PendingCommand> {
        self.inner.slot(index).and_then(|slot| slot.pending())
    }

    pub fn receiver_count(&self) -> usize {
        self.inner.slots.read().len()
    }

    pub fn endpoints(&self) -> Vec<ReceiverEndpoint> {
        self.inner
            .slots
            .read()
            .iter()
            .map(|slot| slot.client().endpoint().clone())
            .collect()
    }

    /// Number of times the receiver list has been (re)built
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Cancel all timers and destroy all clients; idempotent
    pub fn shutdown(&self) {
        let mut slots = self.inner.slots.write();
        if slots.is_empty() {
            return;
        }
        self.inner.teardown_locked(&mut slots);
        // Anything still in flight now carries a stale generation
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Coordinator shut down");
    }
}

impl Inner {
    fn slot(&self, index: usize) -> Option<Arc<ReceiverSlot>> {
        self.slots.read().get(index).cloned()
    }

    fn live_slot(&self, index: usize) -> Result<Arc<ReceiverSlot>> {
        match self.slot(index) {
            Some(slot) if slot.is_live() => Ok(slot),
            _ => Err(CoordinatorError::UnknownReceiver(index)),
        }
    }

    fn context(&self) -> Result<Arc<SlotContext>> {
        self.context.lock().clone().ok_or_else(|| {
            CoordinatorError::Configuration("coordinator has no receivers".to_string())
        })
    }

    fn teardown_locked(&self, slots: &mut Vec<Arc<ReceiverSlot>>) {
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
        for slot in slots.drain(..) {
            slot.teardown();
        }
        self.context.lock().take();
    }

    fn handle_device_message(&self, message: DeviceMessage) {
        let DeviceMessage {
            index,
            generation,
            event,
        } = message;

        if generation != self.generation.load(Ordering::SeqCst) {
            tracing::debug!(
                "Dropping message from receiver {} of stale generation {}",
                index,
                generation
            );
            return;
        }
        let Some(slot) = self.slot(index).filter(|s| s.generation() == generation) else {
            return;
        };
        let sink = &*self.sink;

        match event {
            DeviceEvent::Baseline(state) => {
                tracing::info!(
                    "Receiver {}: connected, volume {} muted {}",
                    slot.index(),
                    state.volume_display,
                    state.muted
                );
                slot.reconcile(sink, state);
            }
            DeviceEvent::VolumeChanged { previous, volume } => {
                tracing::debug!("Receiver {}: volume {} -> {}", index, previous, volume);
                slot.publish_volume(sink, volume);
            }
            DeviceEvent::MuteChanged { muted } => {
                tracing::debug!("Receiver {}: muted {}", index, muted);
                slot.publish_mute(sink, muted);
            }
            DeviceEvent::Error { message, .. } => {
                sink.report_error(index, &CoordinatorError::Poll { index, message });
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let mut slots = std::mem::take(&mut *self.slots.write());
        self.teardown_locked(&mut slots);
    }
}

async fn run_event_pump(
    inner: Weak<Inner>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<DeviceMessage>,
) {
    while let Some(message) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.handle_device_message(message);
    }
    tracing::debug!("Event pump for generation {} finished", generation);
}
