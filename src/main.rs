//! # TelloPad
//!
//! Fly a Tello with a gamepad and watch its video in `mplayer`.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging and load `tellopad.toml` (defaults if absent)
//!    - Start the video player with its stdin piped
//!    - Open the drone link and the gamepad
//!
//! 2. **Running**
//!    - Gamepad events are routed to drone commands
//!    - On connect the drone is set to 4 Mbps, video is started and the
//!      `StartVideo` heartbeat runs every 100 ms
//!    - Video packets are relayed to the player
//!
//! 3. **Shutdown**
//!    - Ctrl+C stops the process
//!
//! If the player cannot be started the video pipeline is abandoned and flying
//! continues without video.
//!
//! # Examples
//!
//! ```bash
//! cargo run --release
//! ```
//!
//! Expected output:
//! ```text
//! INFO tellopad: TelloPad v0.1.0 starting...
//! INFO tellopad::video: Started mplayer (pid Some(4242))
//! INFO tellopad::controller::gamepad: Found DualShock 4 controller at: /dev/input/event17
//! INFO tellopad::lifecycle: Connected
//! INFO tellopad::lifecycle: Video streaming
//! INFO tellopad::router: Takeoff
//! ```

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use tellopad::app;
use tellopad::config::{Config, DEFAULT_CONFIG_PATH};
use tellopad::drone::{tello, Actuator};
use tellopad::lifecycle::LifecycleSettings;
use tellopad::telemetry;
use tellopad::video::DecoderProcess;

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = app::init_logging();

    info!("TelloPad v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::load_or_default(DEFAULT_CONFIG_PATH)?;
    let settings = LifecycleSettings::playback(&config)?;

    // The player must be up before the drone starts streaming into it
    let mut player = match DecoderProcess::spawn_player(&config.video.player) {
        Ok(player) => Some(player),
        Err(e) => {
            error!("{}; continuing without video", e);
            None
        }
    };
    let relay = match player.as_mut().map(DecoderProcess::take_stdin) {
        Some(Ok(stdin)) => Some(app::start_video_relay(stdin)),
        Some(Err(e)) => {
            error!("{}; continuing without video", e);
            None
        }
        None => None,
    };

    let (handle, events) = tello::connect(&config.drone).await?;
    let actuator: Arc<dyn Actuator> = Arc::new(handle);
    let (flight_data_tx, flight_data_rx) = watch::channel(None);

    app::start_gamepad(&config, Arc::clone(&actuator), flight_data_rx.clone())?;
    app::start_drone_events(
        events,
        Arc::clone(&actuator),
        settings,
        flight_data_tx,
        relay.as_ref().map(|(tx, _)| tx.clone()),
    );
    telemetry::spawn_recorder(&config.telemetry, flight_data_rx);

    info!("Press Ctrl+C to exit");
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");

    if let Some(mut player) = player {
        player.kill().await;
    }

    Ok(())
}
