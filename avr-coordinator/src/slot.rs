//! Per-receiver coordination state
//!
//! A slot pairs one `DeviceClient` with the state published to the host for
//! the same index, and owns every timer armed on the receiver's behalf. The
//! whole task set is aborted together when the slot is torn down.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use avr_api::StepDirection;
use avr_device::{DeviceClient, DeviceState};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;
use crate::request::{HostVolumeState, PendingCommand, ReceiverPhase, VolumeMode};
use crate::sink::StateSink;

/// What slot tasks need from the coordinator
pub(crate) struct SlotContext {
    pub(crate) config: CoordinatorConfig,
    pub(crate) sink: Arc<dyn StateSink>,
    pub(crate) generation: Arc<AtomicU64>,
    pub(crate) runtime: Handle,
}

impl SlotContext {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

struct Debounce {
    ticket: u64,
    pending: PendingCommand,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct SlotTasks {
    debounce: Option<Debounce>,
    next_ticket: u64,
    committing: u32,
    /// Debounce tasks that moved on to committing
    in_flight: Vec<JoinHandle<()>>,
    follow_up: Option<JoinHandle<()>>,
    /// A follow-up poll was skipped and host state is unconfirmed
    confirm_owed: bool,
}

impl SlotTasks {
    fn phase(&self) -> ReceiverPhase {
        if self.debounce.is_some() {
            ReceiverPhase::Debouncing
        } else if self.committing > 0 {
            ReceiverPhase::Committing
        } else {
            ReceiverPhase::Idle
        }
    }
}

pub(crate) struct ReceiverSlot {
    index: usize,
    generation: u64,
    client: DeviceClient,
    host: Mutex<Option<HostVolumeState>>,
    tasks: Mutex<SlotTasks>,
    command_lock: tokio::sync::Mutex<()>,
    torn_down: AtomicBool,
}

/// Outcome of a committed volume request
enum Committed {
    Target(f32),
    Stepped,
    Nothing,
}

impl ReceiverSlot {
    pub(crate) fn new(client: DeviceClient) -> Self {
        Self {
            index: client.index(),
            generation: client.generation(),
            client,
            host: Mutex::new(None),
            tasks: Mutex::new(SlotTasks::default()),
            command_lock: tokio::sync::Mutex::new(()),
            torn_down: AtomicBool::new(false),
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn client(&self) -> &DeviceClient {
        &self.client
    }

    pub(crate) fn is_live(&self) -> bool {
        !self.torn_down.load(Ordering::SeqCst) && !self.client.is_destroyed()
    }

    pub(crate) fn host_state(&self) -> Option<HostVolumeState> {
        *self.host.lock()
    }

    pub(crate) fn pending(&self) -> Option<PendingCommand> {
        self.tasks.lock().debounce.as_ref().map(|d| d.pending)
    }

    pub(crate) fn phase(&self) -> ReceiverPhase {
        self.tasks.lock().phase()
    }

    /// Volume a relative request builds on: what the host sees, else the cache
    fn current_volume(&self) -> Option<f32> {
        self.host_state()
            .map(|h| h.volume_value)
            .or_else(|| self.client.state().map(|s| s.volume_display))
    }

    /// Publish `update` applied to the current host state, if it changes it
    fn publish_with(&self, sink: &dyn StateSink, update: impl FnOnce(&mut HostVolumeState)) {
        if self.torn_down.load(Ordering::SeqCst) {
            return;
        }

        let mut host = self.host.lock();
        let mut next = (*host)
            .or_else(|| self.client.state().map(HostVolumeState::from))
            .unwrap_or_default();
        update(&mut next);

        if *host == Some(next) {
            return;
        }
        *host = Some(next);
        tracing::debug!(
            "Receiver {}: publishing volume {} muted {}",
            self.index,
            next.volume_value,
            next.is_muted
        );
        sink.update_state(self.index, next);
    }

    pub(crate) fn publish_volume(&self, sink: &dyn StateSink, volume: f32) {
        self.publish_with(sink, |state| state.volume_value = volume);
    }

    pub(crate) fn publish_mute(&self, sink: &dyn StateSink, muted: bool) {
        self.publish_with(sink, |state| state.is_muted = muted);
    }

    /// Make the host state match a polled snapshot
    pub(crate) fn reconcile(&self, sink: &dyn StateSink, state: DeviceState) {
        self.publish_with(sink, |host| *host = HostVolumeState::from(state));
    }

    /// (Re)arm the debounce timer with `pending`, replacing any earlier request
    pub(crate) fn arm_debounce(self: &Arc<Self>, ctx: &Arc<SlotContext>, pending: PendingCommand) {
        let mut tasks = self.tasks.lock();
        if self.torn_down.load(Ordering::SeqCst) {
            return;
        }

        if let Some(previous) = tasks.debounce.take() {
            previous.handle.abort();
            tracing::debug!(
                "Receiver {}: {:?} {} superseded by {:?} {}",
                self.index,
                previous.pending.mode,
                previous.pending.value,
                pending.mode,
                pending.value
            );
        }

        tasks.next_ticket += 1;
        let ticket = tasks.next_ticket;
        let slot = Arc::clone(self);
        let task_ctx = Arc::clone(ctx);
        let window = ctx.config.debounce_window;

        let handle = ctx.runtime.spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(pending) = slot.take_pending(ticket) {
                slot.commit(&task_ctx, pending).await;
            }
        });

        tasks.debounce = Some(Debounce {
            ticket,
            pending,
            handle,
        });
    }

    /// Claim the pending request for the task holding `ticket`
    fn take_pending(&self, ticket: u64) -> Option<PendingCommand> {
        let mut tasks = self.tasks.lock();
        match tasks.debounce.take() {
            Some(debounce) if debounce.ticket == ticket => {
                tasks.in_flight.retain(|handle| !handle.is_finished());
                tasks.in_flight.push(debounce.handle);
                tasks.committing += 1;
                Some(debounce.pending)
            }
            other => {
                tasks.debounce = other;
                None
            }
        }
    }

    async fn commit(self: &Arc<Self>, ctx: &Arc<SlotContext>, pending: PendingCommand) {
        let result = self.run_commit(ctx, pending).await;
        self.tasks.lock().committing -= 1;

        match result {
            Ok(Committed::Target(target)) => {
                self.client.suppress_for(ctx.config.suppression_window);
                self.publish_volume(&*ctx.sink, target);
                self.schedule_follow_up(ctx, ctx.config.confirmation_delay);
            }
            Ok(Committed::Stepped) => {
                self.schedule_follow_up(ctx, ctx.config.step_poll_delay);
            }
            Ok(Committed::Nothing) => self.settle_owed_confirmation(ctx),
            Err(e) => {
                tracing::warn!("Receiver {}: volume request failed: {}", self.index, e);
                ctx.sink.report_error(self.index, &e);
                self.settle_owed_confirmation(ctx);
            }
        }
    }

    /// Confirm now if an earlier follow-up skipped its reconcile
    ///
    /// Requests that end without scheduling a follow-up of their own call
    /// this, so an optimistic value never outlives the request that
    /// overlapped its confirmation.
    fn settle_owed_confirmation(self: &Arc<Self>, ctx: &Arc<SlotContext>) {
        let owed = {
            let tasks = self.tasks.lock();
            tasks.confirm_owed && tasks.phase() == ReceiverPhase::Idle
        };
        if owed {
            tracing::debug!("Receiver {}: confirming skipped follow-up", self.index);
            self.schedule_follow_up(ctx, Duration::ZERO);
        }
    }

    async fn run_commit(
        &self,
        ctx: &SlotContext,
        pending: PendingCommand,
    ) -> Result<Committed, CoordinatorError> {
        let _command = self.command_lock.lock().await;
        if !ctx.is_current(self.generation) || !self.is_live() {
            tracing::debug!("Receiver {}: dropping request from stale generation", self.index);
            return Ok(Committed::Nothing);
        }

        tracing::debug!(
            "Receiver {}: committing {:?} {} (waited {:?})",
            self.index,
            pending.mode,
            pending.value,
            pending.scheduled_at.elapsed()
        );

        let device_error = |e| CoordinatorError::device(self.index, e);
        match pending.mode {
            VolumeMode::Absolute => self
                .client
                .issue_volume_command(pending.value)
                .await
                .map(Committed::Target)
                .map_err(device_error),
            VolumeMode::Relative => {
                let current = self
                    .current_volume()
                    .ok_or(CoordinatorError::StateUnknown(self.index))?;
                self.client
                    .issue_volume_command(current + pending.value)
                    .await
                    .map(Committed::Target)
                    .map_err(device_error)
            }
            VolumeMode::RelativeStep => match StepDirection::from_delta(pending.value) {
                Some(direction) => self
                    .client
                    .step_volume(direction)
                    .await
                    .map(|_| Committed::Stepped)
                    .map_err(device_error),
                None => Ok(Committed::Nothing),
            },
        }
    }

    /// Send a mute command now, outside the debounce path
    pub(crate) async fn commit_mute(
        self: &Arc<Self>,
        ctx: &Arc<SlotContext>,
        muted: bool,
    ) -> Result<(), CoordinatorError> {
        let result = {
            let _command = self.command_lock.lock().await;
            if !ctx.is_current(self.generation) || !self.is_live() {
                tracing::debug!("Receiver {}: dropping mute from stale generation", self.index);
                return Ok(());
            }
            self.client.set_mute(muted).await
        };

        match result {
            Ok(()) => {
                self.client.suppress_for(ctx.config.suppression_window);
                self.publish_mute(&*ctx.sink, muted);
                self.schedule_follow_up(ctx, ctx.config.confirmation_delay);
                Ok(())
            }
            Err(e) => {
                let error = CoordinatorError::device(self.index, e);
                tracing::warn!("Receiver {}: mute request failed: {}", self.index, error);
                ctx.sink.report_error(self.index, &error);
                Err(error)
            }
        }
    }

    /// Poll once after `delay` and adopt the result as the host state
    ///
    /// Replaces any follow-up poll already scheduled. If another request is
    /// in progress by then the result is not adopted and the confirmation
    /// stays owed: that request either schedules its own follow-up or settles
    /// the owed one when it ends.
    fn schedule_follow_up(self: &Arc<Self>, ctx: &Arc<SlotContext>, delay: Duration) {
        let mut tasks = self.tasks.lock();
        if self.torn_down.load(Ordering::SeqCst) {
            return;
        }
        if let Some(previous) = tasks.follow_up.take() {
            previous.abort();
        }

        let slot = Arc::clone(self);
        let task_ctx = Arc::clone(ctx);
        tasks.follow_up = Some(ctx.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if !task_ctx.is_current(slot.generation) {
                return;
            }
            let Some(state) = slot.client.poll().await else {
                slot.tasks.lock().confirm_owed = true;
                return;
            };
            let idle = {
                let mut tasks = slot.tasks.lock();
                let idle = tasks.phase() == ReceiverPhase::Idle;
                tasks.confirm_owed = !idle;
                idle
            };
            if idle {
                slot.reconcile(&*task_ctx.sink, state);
            }
        }));
    }

    /// Cancel every task, then destroy the client
    pub(crate) fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }

        {
            let mut tasks = self.tasks.lock();
            if let Some(debounce) = tasks.debounce.take() {
                debounce.handle.abort();
            }
            for handle in tasks.in_flight.drain(..) {
                handle.abort();
            }
            if let Some(follow_up) = tasks.follow_up.take() {
                follow_up.abort();
            }
        }

        self.client.destroy();
        tracing::debug!(
            "Receiver {} (generation {}) torn down",
            self.index,
            self.generation
        );
    }
}
