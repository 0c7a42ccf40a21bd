//! Interactive console driving real receivers through the coordinator
//!
//! ```text
//! cargo run -p avr-bridge-coordinator --example bridge_console -- settings.json
//! ```
//!
//! `settings.json` holds `{"receivers": [{"address": "192.168.1.40"}]}`.
//! Commands on stdin:
//!
//! ```text
//! <index> abs <value>     absolute volume
//! <index> rel <delta>     relative volume
//! <index> step <+1|-1>    one receiver step
//! <index> mute | unmute
//! quit
//! ```

use std::sync::Arc;

use avr_api::HttpConnector;
use avr_coordinator::logging::init_logging_from_env;
use avr_coordinator::{
    BridgeSettings, CoordinatorConfig, CoordinatorError, HostVolumeState, MuteAction, StateSink,
    VolumeCoordinator, VolumeRequest,
};
use tokio::io::{AsyncBufReadExt, BufReader};

struct ConsoleSink;

impl StateSink for ConsoleSink {
    fn update_state(&self, index: usize, state: HostVolumeState) {
        println!(
            "[{}] volume {:>4.1}{}",
            index,
            state.volume_value,
            if state.is_muted { " (muted)" } else { "" }
        );
    }

    fn report_error(&self, index: usize, error: &CoordinatorError) {
        eprintln!("[{}] error: {}", index, error);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging_from_env()?;

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: bridge_console <settings.json>")?;
    let settings = BridgeSettings::from_json(&std::fs::read_to_string(path)?)?;

    let coordinator = VolumeCoordinator::new(
        CoordinatorConfig::default(),
        Arc::new(HttpConnector::new()),
        Arc::new(ConsoleSink),
    )?;
    coordinator.update_settings(settings.receivers).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.first() == Some(&"quit") {
            break;
        }

        let Some(index) = words.first().and_then(|w| w.parse::<usize>().ok()) else {
            eprintln!("expected a receiver index");
            continue;
        };
        let value = words.get(2).and_then(|w| w.parse::<f32>().ok());

        let result = match (words.get(1).copied(), value) {
            (Some("abs"), Some(v)) => coordinator.set_volume(index, VolumeRequest::absolute(v)),
            (Some("rel"), Some(v)) => coordinator.set_volume(index, VolumeRequest::relative(v)),
            (Some("step"), Some(v)) => coordinator.set_volume(index, VolumeRequest::step(v)),
            (Some("mute"), _) => coordinator.set_mute(index, MuteAction::Mute).await,
            (Some("unmute"), _) => coordinator.set_mute(index, MuteAction::Unmute).await,
            _ => {
                eprintln!("unknown command: {}", line);
                continue;
            }
        };

        if let Err(e) = result {
            eprintln!("{}", e);
        }
    }

    coordinator.shutdown();
    Ok(())
}
