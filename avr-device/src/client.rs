//! Device client for a single receiver

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use avr_api::volume::clamp_display;
use avr_api::{Command, ReceiverApi, ReceiverEndpoint, StepDirection};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::{DeviceError, Result};
use crate::event::{DeviceEvent, DeviceMessage};
use crate::polling::PollingTask;
use crate::state::{DeviceState, PollStats};

/// Owns the relationship with one receiver
///
/// The client is the only writer of its `DeviceState`. Commands go straight
/// to the receiver; the cache only changes when a poll reads the receiver
/// back. Observed changes are sent as `DeviceMessage`s on the channel
/// supplied at construction.
pub struct DeviceClient {
    shared: Arc<ClientShared>,
    poller: Mutex<Option<PollingTask>>,
}

/// State shared between the client handle and its polling task
pub(crate) struct ClientShared {
    index: usize,
    generation: u64,
    endpoint: ReceiverEndpoint,
    api: Arc<dyn ReceiverApi>,
    state: Mutex<Option<DeviceState>>,
    suppressed_until: Mutex<Option<Instant>>,
    events: Mutex<Option<mpsc::UnboundedSender<DeviceMessage>>>,
    destroyed: AtomicBool,
    polls: AtomicU64,
    failures: AtomicU64,
    consecutive_failures: AtomicU32,
}

impl DeviceClient {
    pub fn new(
        index: usize,
        generation: u64,
        endpoint: ReceiverEndpoint,
        api: Arc<dyn ReceiverApi>,
        events: mpsc::UnboundedSender<DeviceMessage>,
    ) -> Self {
        Self {
            shared: Arc::new(ClientShared {
                index,
                generation,
                endpoint,
                api,
                state: Mutex::new(None),
                suppressed_until: Mutex::new(None),
                events: Mutex::new(Some(events)),
                destroyed: AtomicBool::new(false),
                polls: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                consecutive_failures: AtomicU32::new(0),
            }),
            poller: Mutex::new(None),
        }
    }

    pub fn index(&self) -> usize {
        self.shared.index
    }

    pub fn generation(&self) -> u64 {
        self.shared.generation
    }

    pub fn endpoint(&self) -> &ReceiverEndpoint {
        &self.shared.endpoint
    }

    /// Last polled snapshot, `None` until the first successful poll
    pub fn state(&self) -> Option<DeviceState> {
        *self.shared.state.lock()
    }

    pub fn stats(&self) -> PollStats {
        self.shared.stats()
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.is_destroyed()
    }

    /// Set the master volume
    ///
    /// The target is clamped to [0, 98] and rounded to the nearest half
    /// step; the value actually sent is returned. No retry on failure.
    pub async fn issue_volume_command(&self, target: f32) -> Result<f32> {
        if target.is_nan() {
            return Err(DeviceError::InvalidVolume(target));
        }
        let target = clamp_display(target);
        self.send(Command::SetVolume(target)).await?;
        Ok(target)
    }

    /// Nudge the volume one receiver step up or down
    ///
    /// The step size is the receiver's business, so the cache is left alone
    /// until the next poll.
    pub async fn step_volume(&self, direction: StepDirection) -> Result<()> {
        self.send(Command::step(direction)).await
    }

    pub async fn set_mute(&self, muted: bool) -> Result<()> {
        self.send(Command::mute(muted)).await
    }

    /// Query the receiver now and update the cache
    ///
    /// Returns the fresh snapshot, or `None` if the poll failed (an `Error`
    /// message is emitted in that case) or the client was destroyed.
    pub async fn poll(&self) -> Option<DeviceState> {
        self.shared.poll().await
    }

    /// Hold back change notifications for `duration` from now
    ///
    /// Only ever extends the window.
    pub fn suppress_for(&self, duration: Duration) {
        self.shared.suppress_until(Instant::now() + duration);
    }

    pub fn suppressed_until(&self) -> Option<Instant> {
        *self.shared.suppressed_until.lock()
    }

    /// Start polling every `interval`, with an immediate first poll
    ///
    /// A running loop is stopped first, so there is never more than one.
    pub fn start_polling(&self, interval: Duration) {
        if self.is_destroyed() {
            tracing::debug!("Not starting polling for destroyed client {}", self.shared.endpoint);
            return;
        }

        let mut poller = self.poller.lock();
        if let Some(previous) = poller.take() {
            previous.stop();
        }
        *poller = Some(PollingTask::start(Arc::clone(&self.shared), interval));
    }

    pub fn stop_polling(&self) {
        if let Some(task) = self.poller.lock().take() {
            task.stop();
            tracing::debug!("Stopped polling {}", self.shared.endpoint);
        }
    }

    /// Effective interval of the running loop
    pub fn poll_interval(&self) -> Option<Duration> {
        self.poller.lock().as_ref().map(|task| task.interval())
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .as_ref()
            .map(|task| task.is_running())
            .unwrap_or(false)
    }

    /// Stop polling and drop the event sender
    ///
    /// Idempotent. After this every command fails with
    /// `DeviceError::Destroyed` and polls are no-ops.
    pub fn destroy(&self) {
        if self.shared.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_polling();
        self.shared.events.lock().take();
        tracing::debug!(
            "Destroyed client {} (index {}, generation {})",
            self.shared.endpoint,
            self.shared.index,
            self.shared.generation
        );
    }

    async fn send(&self, command: Command) -> Result<()> {
        if self.is_destroyed() {
            return Err(DeviceError::Destroyed);
        }

        tracing::debug!("{}: sending {}", self.shared.endpoint, command);
        self.shared
            .api
            .send(&command)
            .await
            .map_err(|source| DeviceError::Command {
                command: command.token(),
                source,
            })
    }
}

impl Drop for DeviceClient {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl ClientShared {
    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub(crate) fn endpoint(&self) -> &ReceiverEndpoint {
        &self.endpoint
    }

    fn stats(&self) -> PollStats {
        PollStats {
            polls: self.polls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
        }
    }

    fn suppress_until(&self, deadline: Instant) {
        let mut current = self.suppressed_until.lock();
        match *current {
            Some(existing) if existing >= deadline => {}
            _ => *current = Some(deadline),
        }
    }

    fn is_suppressed(&self, now: Instant) -> bool {
        self.suppressed_until
            .lock()
            .map(|deadline| now < deadline)
            .unwrap_or(false)
    }

    pub(crate) async fn poll(&self) -> Option<DeviceState> {
        if self.is_destroyed() {
            return None;
        }

        self.polls.fetch_add(1, Ordering::Relaxed);
        let result = self.api.status().await;

        if self.is_destroyed() {
            return None;
        }

        let status = match result {
            Ok(status) => status,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                let attempt = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    "Poll of {} failed (attempt {}): {}",
                    self.endpoint,
                    attempt,
                    e
                );
                self.emit(DeviceEvent::Error {
                    message: e.to_string(),
                    unreachable: e.is_transport(),
                });
                return None;
            }
        };
        self.consecutive_failures.store(0, Ordering::Relaxed);

        let now = Instant::now();
        let fresh = DeviceState::from_status(status, now);
        let suppressed = self.is_suppressed(now);

        let events = {
            let mut cached = self.state.lock();
            let previous = cached.replace(fresh);
            match previous {
                None => vec![DeviceEvent::Baseline(fresh)],
                Some(previous) => {
                    if previous.power_on != fresh.power_on {
                        tracing::debug!("{}: power on = {}", self.endpoint, fresh.power_on);
                    }
                    let mut changes = Vec::new();
                    if previous.volume_display != fresh.volume_display {
                        changes.push(DeviceEvent::VolumeChanged {
                            previous: previous.volume_display,
                            volume: fresh.volume_display,
                        });
                    }
                    if previous.muted != fresh.muted {
                        changes.push(DeviceEvent::MuteChanged { muted: fresh.muted });
                    }
                    if suppressed && !changes.is_empty() {
                        tracing::debug!(
                            "{}: {} change(s) inside suppression window",
                            self.endpoint,
                            changes.len()
                        );
                        changes.clear();
                    }
                    changes
                }
            }
        };

        for event in events {
            self.emit(event);
        }

        Some(fresh)
    }

    fn emit(&self, event: DeviceEvent) {
        let events = self.events.lock();
        if let Some(sender) = events.as_ref() {
            let message = DeviceMessage {
                index: self.index,
                generation: self.generation,
                event,
            };
            if sender.send(message).is_err() {
                tracing::debug!("Event receiver for {} dropped", self.endpoint);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avr_api::mock::MockReceiver;
    use rstest::rstest;
    use tokio::sync::mpsc::error::TryRecvError;

    fn client_with(
        mock: &MockReceiver,
    ) -> (DeviceClient, mpsc::UnboundedReceiver<DeviceMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = DeviceClient::new(
            0,
            7,
            ReceiverEndpoint::new("192.168.1.40", 8080, "Den"),
            Arc::new(mock.clone()),
            tx,
        );
        (client, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_poll_establishes_baseline() {
        let mock = MockReceiver::with_volume(42.0);
        let (client, mut rx) = client_with(&mock);
        assert!(client.state().is_none());

        let state = client.poll().await.unwrap();
        assert_eq!(state.volume_display, 42.0);

        let message = rx.try_recv().unwrap();
        assert_eq!(message.index, 0);
        assert_eq!(message.generation, 7);
        assert!(matches!(message.event, DeviceEvent::Baseline(s) if s.volume_display == 42.0));

        // Unchanged second poll emits nothing
        client.poll().await.unwrap();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_are_reported_per_field() {
        let mock = MockReceiver::with_volume(30.0);
        let (client, mut rx) = client_with(&mock);
        client.poll().await;
        rx.try_recv().unwrap();

        mock.set_volume(35.5);
        mock.set_muted(true);
        client.poll().await;

        assert_eq!(
            rx.try_recv().unwrap().event,
            DeviceEvent::VolumeChanged {
                previous: 30.0,
                volume: 35.5
            }
        );
        assert_eq!(
            rx.try_recv().unwrap().event,
            DeviceEvent::MuteChanged { muted: true }
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_inside_suppression_window_updates_cache_silently() {
        let mock = MockReceiver::with_volume(30.0);
        let (client, mut rx) = client_with(&mock);
        client.poll().await;
        rx.try_recv().unwrap();

        client.suppress_for(Duration::from_secs(1));
        mock.set_volume(60.0);
        tokio::time::sleep(Duration::from_millis(999)).await;
        client.poll().await;

        assert_eq!(client.state().unwrap().volume_display, 60.0);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        // Window over: the next change is reported again
        tokio::time::sleep(Duration::from_millis(1)).await;
        mock.set_volume(61.0);
        client.poll().await;
        assert_eq!(
            rx.try_recv().unwrap().event,
            DeviceEvent::VolumeChanged {
                previous: 60.0,
                volume: 61.0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_suppression_window_never_moves_backward() {
        let mock = MockReceiver::new();
        let (client, _rx) = client_with(&mock);

        client.suppress_for(Duration::from_secs(2));
        let long = client.suppressed_until().unwrap();
        client.suppress_for(Duration::from_millis(500));
        assert_eq!(client.suppressed_until(), Some(long));

        tokio::time::sleep(Duration::from_secs(1)).await;
        client.suppress_for(Duration::from_secs(5));
        assert!(client.suppressed_until().unwrap() > long);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_emits_error_and_keeps_cache() {
        let mock = MockReceiver::with_volume(30.0);
        let (client, mut rx) = client_with(&mock);
        client.poll().await;
        rx.try_recv().unwrap();

        mock.set_fail_status(true);
        mock.set_volume(80.0);
        assert!(client.poll().await.is_none());

        match rx.try_recv().unwrap().event {
            DeviceEvent::Error { unreachable, .. } => assert!(unreachable),
            other => panic!("Expected DeviceEvent::Error, got {:?}", other),
        }
        assert_eq!(client.state().unwrap().volume_display, 30.0);
        assert_eq!(client.stats().consecutive_failures, 1);
        assert_eq!(client.stats().failures, 1);

        mock.set_fail_status(false);
        client.poll().await.unwrap();
        assert_eq!(client.stats().consecutive_failures, 0);
        assert_eq!(client.stats().polls, 3);
    }

    #[rstest]
    #[case(50.3, 50.5, "MV505")]
    #[case(50.2, 50.0, "MV50")]
    #[case(0.4, 0.5, "MV005")]
    #[case(120.0, 98.0, "MV98")]
    #[case(-3.0, 0.0, "MV0")]
    #[case(f32::INFINITY, 98.0, "MV98")]
    #[tokio::test]
    async fn test_issue_volume_command_clamps_and_rounds(
        #[case] requested: f32,
        #[case] applied: f32,
        #[case] token: &str,
    ) {
        let mock = MockReceiver::new();
        let (client, _rx) = client_with(&mock);

        assert_eq!(client.issue_volume_command(requested).await.unwrap(), applied);

        let tokens: Vec<String> = mock.commands().iter().map(|c| c.token()).collect();
        assert_eq!(tokens, vec![token]);
        // Commands never write the cache
        assert!(client.state().is_none());
    }

    #[tokio::test]
    async fn test_issue_volume_command_rejects_nan() {
        let mock = MockReceiver::new();
        let (client, _rx) = client_with(&mock);

        let err = client.issue_volume_command(f32::NAN).await.unwrap_err();
        assert!(matches!(err, DeviceError::InvalidVolume(_)));
        assert!(mock.commands().is_empty());
    }

    #[tokio::test]
    async fn test_step_volume_leaves_cache_until_poll() {
        let mock = MockReceiver::with_volume(30.0);
        let (client, _rx) = client_with(&mock);
        client.poll().await;

        client.step_volume(StepDirection::Up).await.unwrap();
        assert_eq!(mock.commands(), vec![Command::VolumeUp]);
        assert_eq!(client.state().unwrap().volume_display, 30.0);

        client.poll().await;
        assert_eq!(client.state().unwrap().volume_display, 30.5);
    }

    #[tokio::test]
    async fn test_command_failure_is_reported() {
        let mock = MockReceiver::new();
        mock.set_fail_commands(true);
        let (client, _rx) = client_with(&mock);

        let err = client.set_mute(true).await.unwrap_err();
        match err {
            DeviceError::Command { ref command, .. } => assert_eq!(command, "MUON"),
            ref other => panic!("Expected DeviceError::Command, got {:?}", other),
        }
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent_and_releases_listener() {
        let mock = MockReceiver::new();
        let (client, mut rx) = client_with(&mock);
        client.start_polling(Duration::from_secs(60));

        client.destroy();
        client.destroy();

        assert!(client.is_destroyed());
        assert!(!client.is_polling());
        assert!(matches!(
            client.issue_volume_command(40.0).await,
            Err(DeviceError::Destroyed)
        ));
        assert!(client.poll().await.is_none());

        // Sender dropped: drain whatever the immediate poll produced, then closed
        while rx.recv().await.is_some() {}
    }
}
