//! Background polling loop for a device client

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::client::ClientShared;

/// Shortest interval the loop accepts
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Interval used when none is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A running poll loop; aborted when stopped or dropped
#[derive(Debug)]
pub(crate) struct PollingTask {
    interval: Duration,
    handle: JoinHandle<()>,
}

impl PollingTask {
    /// Spawn the loop; the first poll happens immediately
    pub(crate) fn start(shared: Arc<ClientShared>, interval: Duration) -> Self {
        let interval = if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                "Poll interval {:?} for {} is below {:?}, using the minimum",
                interval,
                shared.endpoint(),
                MIN_POLL_INTERVAL
            );
            MIN_POLL_INTERVAL
        } else {
            interval
        };

        tracing::debug!(
            "Starting polling for {} (interval: {:?})",
            shared.endpoint(),
            interval
        );

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                // Failures are reported by poll() itself; the loop keeps going
                shared.poll().await;
            }
        });

        Self {
            interval,
            handle,
        }
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub(crate) fn stop(self) {
        // Drop aborts the task
    }
}

impl Drop for PollingTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
