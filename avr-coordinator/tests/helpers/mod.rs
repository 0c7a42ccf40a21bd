//! Shared setup for coordinator tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use avr_api::mock::{MockConnector, MockReceiver};
use avr_api::ReceiverEndpoint;
use avr_coordinator::{
    CoordinatorConfig, CoordinatorError, HostVolumeState, StateSink, VolumeCoordinator,
};

/// Sink recording every update and error it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<(usize, HostVolumeState)>>,
    errors: Mutex<Vec<(usize, String)>>,
}

impl RecordingSink {
    pub fn updates(&self) -> Vec<(usize, HostVolumeState)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn updates_for(&self, index: usize) -> Vec<HostVolumeState> {
        self.updates()
            .into_iter()
            .filter(|(i, _)| *i == index)
            .map(|(_, state)| state)
            .collect()
    }

    pub fn errors(&self) -> Vec<(usize, String)> {
        self.errors.lock().unwrap().clone()
    }
}

impl StateSink for RecordingSink {
    fn update_state(&self, index: usize, state: HostVolumeState) {
        self.updates.lock().unwrap().push((index, state));
    }

    fn report_error(&self, index: usize, error: &CoordinatorError) {
        self.errors.lock().unwrap().push((index, error.to_string()));
    }
}

pub struct Harness {
    pub coordinator: VolumeCoordinator,
    pub connector: MockConnector,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn receiver(&self, address: &str) -> MockReceiver {
        self.connector.receiver(address)
    }
}

/// Config whose regular poll never fires during a test unless waited for
pub fn quiet_config() -> CoordinatorConfig {
    CoordinatorConfig {
        poll_interval: Duration::from_secs(600),
        ..CoordinatorConfig::default()
    }
}

pub fn endpoints(addresses: &[&str]) -> Vec<ReceiverEndpoint> {
    addresses
        .iter()
        .map(|address| ReceiverEndpoint::new(*address, 8080, format!("AVR {}", address)))
        .collect()
}

/// Coordinator over mock receivers at `addresses`, baselines already published
pub async fn start(config: CoordinatorConfig, addresses: &[&str]) -> Harness {
    let connector = MockConnector::new();
    for address in addresses {
        connector.insert(address, MockReceiver::new());
    }
    start_with(config, connector, addresses).await
}

pub async fn start_with(
    config: CoordinatorConfig,
    connector: MockConnector,
    addresses: &[&str],
) -> Harness {
    let sink = Arc::new(RecordingSink::default());
    let coordinator =
        VolumeCoordinator::new(config, Arc::new(connector.clone()), sink.clone()).unwrap();
    coordinator.update_settings(endpoints(addresses)).await.unwrap();
    settle().await;

    Harness {
        coordinator,
        connector,
        sink,
    }
}

/// Let spawned tasks run without crossing any timer boundary that matters
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub async fn advance(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}
