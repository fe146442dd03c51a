//! Example: Relay a game client and mimic a clicked avatar
//!
//! Starts the relay with the mimic controller armed. Point the game client at
//! the listen address, click another user in a room and your avatar copies
//! them until they leave or the relay is stopped.
//!
//! Run with: `cargo run --example mimic_proxy -- [config.toml]`

use room_intercept::config::InterceptorConfig;
use room_intercept::game::{RoomTracker, TrackerEvent};
use room_intercept::protocol::{DialectRegistry, Interceptor};
use room_intercept::service::{Controller, Mimic};
use room_intercept::utils::logging::init_logging;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => InterceptorConfig::from_file(path)?,
        None => InterceptorConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    config.validate_strict()?;
    init_logging(&config.logging)?;

    let interceptor =
        Interceptor::with_timeout(DialectRegistry::builtin(), config.correlator.default_timeout);
    let tracker = Arc::new(RoomTracker::new(&interceptor));
    let mimic = Mimic::new(interceptor.clone(), tracker.clone(), config.mimic);

    // Arm the controller whenever a room is entered.
    let armed = Arc::downgrade(&mimic);
    let _arm = tracker.subscribe(move |event| {
        if let (TrackerEvent::RoomEntered { .. }, Some(mimic)) = (event, armed.upgrade()) {
            mimic.start();
        }
    });

    let mut status = mimic.status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            info!(state = ?current.state, target = ?current.target_name, "{}", current.message);
        }
    });

    room_intercept::transport::listen(config.proxy, interceptor).await?;
    Ok(())
}
