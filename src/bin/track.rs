//! # TelloPad Track
//!
//! Gamepad flight plus face tracking. Video from the drone is decoded by `ffmpeg`
//! into raw BGR frames, an SSD face detector runs on each frame and the drone
//! yaws and climbs to keep the face centered.
//!
//! ```bash
//! cargo run --release --features onnx --bin tellopad-track -- face.onnx face.onnx.data
//! ```
//!
//! Ctrl+C stops the tracking loop and exits.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use tellopad::app;
use tellopad::cli::{parse_track_args, TrackInvocation, TRACK_USAGE};
use tellopad::config::{Config, DEFAULT_CONFIG_PATH};
use tellopad::drone::{tello, Actuator};
use tellopad::lifecycle::LifecycleSettings;
use tellopad::telemetry;
use tellopad::tracking::detector::OnnxDetector;
use tellopad::tracking::{TrackingLoop, TrackingSettings};
use tellopad::video::{decoder_args, DecoderProcess};

#[tokio::main]
async fn main() -> Result<()> {
    let args = match parse_track_args(std::env::args_os()) {
        TrackInvocation::Run(args) => args,
        TrackInvocation::Info(e) => {
            e.print()?;
            return Ok(());
        }
        TrackInvocation::Usage => {
            println!("{}", TRACK_USAGE);
            return Ok(());
        }
    };

    let _log_guard = app::init_logging();

    info!("TelloPad Track v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::load_or_default(DEFAULT_CONFIG_PATH)?;
    let settings = LifecycleSettings::vision(&config)?;
    let tracking = TrackingSettings::from_config(&config.tracking);

    let detector = match OnnxDetector::load(
        &args.protofile,
        &args.modelfile,
        config.tracking.input_width,
        config.tracking.input_height,
    ) {
        Ok(detector) => detector,
        Err(e) => {
            error!("{}", e);
            return Ok(());
        }
    };

    let mut decoder = match DecoderProcess::spawn(
        &config.tracking.decoder,
        &decoder_args(tracking.frame_width, tracking.frame_height),
        true,
    ) {
        Ok(decoder) => Some(decoder),
        Err(e) => {
            error!("{}; continuing without video or tracking", e);
            None
        }
    };
    let pipes = match decoder.as_mut() {
        Some(decoder) => match (decoder.take_stdin(), decoder.take_stdout()) {
            (Ok(stdin), Ok(stdout)) => Some((stdin, stdout)),
            (Err(e), _) | (_, Err(e)) => {
                error!("{}; continuing without video or tracking", e);
                None
            }
        },
        None => None,
    };
    let (frames, relay) = match pipes {
        Some((stdin, stdout)) => (Some(stdout), Some(app::start_video_relay(stdin))),
        None => (None, None),
    };

    let (handle, events) = tello::connect(&config.drone).await?;
    let actuator: Arc<dyn Actuator> = Arc::new(handle);
    let (flight_data_tx, flight_data_rx) = watch::channel(None);

    if let Err(e) = app::start_gamepad(&config, Arc::clone(&actuator), flight_data_rx.clone()) {
        warn!("{}; tracking without manual control", e);
    }
    app::start_drone_events(
        events,
        Arc::clone(&actuator),
        settings,
        flight_data_tx,
        relay.as_ref().map(|(tx, _)| tx.clone()),
    );
    telemetry::spawn_recorder(&config.telemetry, flight_data_rx);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
        stop_tx.send_replace(true);
    });

    info!("Press Ctrl+C to exit");
    match frames {
        Some(frames) => {
            TrackingLoop::new(Arc::clone(&actuator), detector, tracking)
                .run(frames, stop_rx)
                .await;
        }
        None => {
            let mut stop_rx = stop_rx;
            while !*stop_rx.borrow_and_update() {
                if stop_rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(mut decoder) = decoder {
        decoder.kill().await;
    }

    Ok(())
}
