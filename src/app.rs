//! # Runtime Wiring
//!
//! Startup pieces shared by the `tellopad` and `tellopad-track` binaries: logging,
//! the gamepad event source, the drone event source and the video relay.
//!
//! Each event source gets its own [`Dispatcher`] running on its own task, so
//! gamepad handlers and drone handlers never wait on each other.

use bytes::Bytes;
use std::sync::Arc;
use tokio::process::ChildStdin;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use crate::config::Config;
use crate::controller::event::InputEvent;
use crate::controller::gamepad::{self, Gamepad};
use crate::controller::mapper::EventMapper;
use crate::drone::{Actuator, DroneEvent, FlightData};
use crate::error::Result;
use crate::events::Dispatcher;
use crate::lifecycle::{bind_flight_data, bind_video, ConnectionManager, LifecycleSettings};
use crate::router::CommandRouter;
use crate::video::{RelayStats, VideoRelay};

/// Capacity of the gamepad event channel
const INPUT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the relay channel, in video packets
const RELAY_CHANNEL_CAPACITY: usize = 1024;

/// Installs the global tracing subscriber.
///
/// Output goes to stderr through a non-blocking writer; keep the returned guard
/// alive until exit so buffered lines are flushed.
pub fn init_logging() -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(writer)
        .init();
    guard
}

/// Opens the configured gamepad, binds the command router and starts dispatching.
///
/// # Errors
///
/// Returns `ControllerNotFound` / `Controller` if the gamepad cannot be opened,
/// `Config` if the model is unknown, or `Io` if the reader thread cannot start.
pub fn start_gamepad(
    config: &Config,
    actuator: Arc<dyn Actuator>,
    flight_data: watch::Receiver<Option<FlightData>>,
) -> Result<JoinHandle<()>> {
    let profile = config.controller_model()?.profile();
    let gamepad = if config.controller.device_path.is_empty() {
        Gamepad::open(profile)?
    } else {
        Gamepad::open_path(&config.controller.device_path)?
    };
    info!(
        "Gamepad: {} ({})",
        gamepad.name().unwrap_or("unknown"),
        gamepad.device_path()
    );

    let mapper = EventMapper::new(profile, config.controller.axis_min, config.controller.axis_max);
    let (tx, rx) = mpsc::channel::<InputEvent>(INPUT_CHANNEL_CAPACITY);
    gamepad::spawn_reader(gamepad, mapper, tx)?;

    let mut dispatcher = Dispatcher::new();
    CommandRouter::new(actuator, flight_data).bind(&mut dispatcher);
    Ok(tokio::spawn(dispatcher.run(rx)))
}

/// Starts dispatching drone events: connect sequence, flight data store and,
/// when a relay is running, video packets.
pub fn start_drone_events(
    events: mpsc::Receiver<DroneEvent>,
    actuator: Arc<dyn Actuator>,
    settings: LifecycleSettings,
    flight_data: watch::Sender<Option<FlightData>>,
    video: Option<mpsc::Sender<Bytes>>,
) -> JoinHandle<()> {
    let mut dispatcher = Dispatcher::new();
    ConnectionManager::new(actuator, settings).bind(&mut dispatcher);
    bind_flight_data(&mut dispatcher, flight_data);
    if let Some(video) = video {
        bind_video(&mut dispatcher, video);
    }
    tokio::spawn(dispatcher.run(events))
}

/// Spawns the relay task writing into the external process's stdin.
pub fn start_video_relay(stdin: ChildStdin) -> (mpsc::Sender<Bytes>, JoinHandle<RelayStats>) {
    let (tx, rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
    let handle = tokio::spawn(VideoRelay::new().run(rx, stdin));
    (tx, handle)
}
