use crate::error::CoordinatorError;
use crate::request::HostVolumeState;

/// Host-side receiver of state updates
///
/// `update_state` is called with the receiver's published state locked, so
/// updates for one receiver arrive in order. Implementations must return
/// quickly and must not call back into the coordinator from inside it.
pub trait StateSink: Send + Sync {
    fn update_state(&self, index: usize, state: HostVolumeState);

    /// Error channel; failures are already logged before this is called
    fn report_error(&self, index: usize, error: &CoordinatorError) {
        let _ = (index, error);
    }
}

/// Sink that drops everything, for running without a host
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StateSink for NullSink {
    fn update_state(&self, _index: usize, _state: HostVolumeState) {}
}
