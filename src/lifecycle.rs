//! # Connection Lifecycle
//!
//! Drives the drone from `Disconnected` to `VideoStreaming`:
//!
//! ```text
//! Disconnected --Connected event--> Connected --setup issued--> VideoStreaming
//! ```
//!
//! On the connected notification the manager configures the encoder bit rate,
//! optionally the exposure, issues the first `StartVideo` and starts the video
//! heartbeat. Nothing leaves `VideoStreaming` except process exit; a lost link is
//! neither detected nor repaired here.
//!
//! The same drone dispatcher also carries the other two drone event kinds:
//! telemetry updates the shared [`FlightData`] (single writer) and video packets
//! are forwarded to the relay task.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::drone::{Actuator, DroneCommand, DroneEvent, DroneEventKind, FlightData, VideoBitRate};
use crate::error::Result;
use crate::events::Dispatcher;
use crate::video::spawn_heartbeat;

/// Bit rate the playback variant runs at when the config leaves it unset.
pub const PLAYBACK_ENCODER_RATE: VideoBitRate = VideoBitRate::Mbps(4);

/// Exposure the vision variant runs at when the config leaves it unset.
pub const VISION_EXPOSURE: i8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    VideoStreaming,
}

/// Per-variant video setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleSettings {
    pub encoder_rate: VideoBitRate,
    pub exposure: Option<i8>,
    pub heartbeat: Duration,
}

impl LifecycleSettings {
    /// Direct playback: fixed 4 Mbps, camera exposure untouched.
    ///
    /// # Errors
    ///
    /// Returns `Config` error if the configured encoder rate is invalid.
    pub fn playback(config: &Config) -> Result<Self> {
        Ok(Self {
            encoder_rate: config.encoder_rate()?.unwrap_or(PLAYBACK_ENCODER_RATE),
            exposure: config.video.exposure,
            heartbeat: Duration::from_millis(config.video.heartbeat_ms),
        })
    }

    /// Vision tracking: automatic bit rate, exposure reset to 0.
    ///
    /// # Errors
    ///
    /// Returns `Config` error if the configured encoder rate is invalid.
    pub fn vision(config: &Config) -> Result<Self> {
        Ok(Self {
            encoder_rate: config.encoder_rate()?.unwrap_or(VideoBitRate::Auto),
            exposure: Some(config.video.exposure.unwrap_or(VISION_EXPOSURE)),
            heartbeat: Duration::from_millis(config.video.heartbeat_ms),
        })
    }
}

/// Owns the connection state and the heartbeat task.
pub struct ConnectionManager {
    actuator: Arc<dyn Actuator>,
    settings: LifecycleSettings,
    state: watch::Sender<ConnectionState>,
    heartbeat: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    pub fn new(actuator: Arc<dyn Actuator>, settings: LifecycleSettings) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            actuator,
            settings,
            state,
            heartbeat: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Runs the connect sequence. Must be called from within a tokio runtime.
    ///
    /// A repeated notification re-sends the video setup but keeps the running
    /// heartbeat.
    pub fn on_connected(&mut self) {
        info!("Connected");
        self.state.send_replace(ConnectionState::Connected);

        self.actuator
            .issue(DroneCommand::SetVideoEncoderRate(self.settings.encoder_rate));
        if let Some(exposure) = self.settings.exposure {
            self.actuator.issue(DroneCommand::SetExposure(exposure));
        }
        self.actuator.issue(DroneCommand::StartVideo);

        if self.heartbeat.is_none() {
            debug!("Starting video heartbeat every {:?}", self.settings.heartbeat);
            self.heartbeat = Some(spawn_heartbeat(
                Arc::clone(&self.actuator),
                self.settings.heartbeat,
            ));
        }

        self.state.send_replace(ConnectionState::VideoStreaming);
        info!("Video streaming");
    }

    /// Registers the connected handler on the drone dispatcher.
    pub fn bind(mut self, dispatcher: &mut Dispatcher<DroneEvent>) {
        dispatcher.on(DroneEventKind::Connected, move |_| self.on_connected());
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
    }
}

/// Registers the telemetry handler: the only writer of the shared flight data.
pub fn bind_flight_data(dispatcher: &mut Dispatcher<DroneEvent>, store: watch::Sender<Option<FlightData>>) {
    dispatcher.on(DroneEventKind::FlightData, move |event| {
        if let DroneEvent::FlightData(data) = event {
            store.send_replace(Some(*data));
        }
    });
}

/// Registers the video handler, forwarding packets to the relay in arrival order.
///
/// The handler never waits: if the relay is backed up or gone the packet is
/// dropped and logged.
pub fn bind_video(dispatcher: &mut Dispatcher<DroneEvent>, relay: mpsc::Sender<Bytes>) {
    dispatcher.on(DroneEventKind::VideoFrame, move |event| {
        if let DroneEvent::VideoFrame(frame) = event {
            if let Err(e) = relay.try_send(frame.clone()) {
                warn!("Dropping video packet: {}", e);
            }
        }
    });
}
