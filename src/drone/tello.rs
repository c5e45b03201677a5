//! # Tello UDP Link
//!
//! The concrete drone collaborator. Three UDP sockets:
//!
//! - command socket (`local_port` → `address`): SDK text commands and their replies
//! - state socket (`state_port`): `key:value;` telemetry broadcasts
//! - video socket (`video_port`): raw H.264 transport packets
//!
//! [`connect`] spawns one task per socket and returns a [`TelloHandle`]
//! (the [`Actuator`]) together with the receiving end of the drone event stream.

use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::sdk::{self, RcState, CMD_ENTER_SDK, RESPONSE_OK};
use super::{Actuator, DroneCommand, DroneEvent};
use crate::config::DroneConfig;
use crate::error::{Result, TelloPadError};

/// Largest datagram the drone sends on any socket
const MAX_DATAGRAM_SIZE: usize = 2048;

/// Capacity of the drone event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Pause after a failed receive on the state or video socket
const SOCKET_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Fire-and-forget command handle.
///
/// Commands are queued to the command task and sent in the order they were
/// issued by this handle's clones. Nothing is reported back to the caller.
#[derive(Debug, Clone)]
pub struct TelloHandle {
    tx: mpsc::UnboundedSender<DroneCommand>,
}

impl Actuator for TelloHandle {
    fn issue(&self, command: DroneCommand) {
        debug!("Issue {}", command);
        if self.tx.send(command).is_err() {
            debug!("Command task stopped, dropping {}", command);
        }
    }
}

/// Opens the drone sockets and spawns the link tasks.
///
/// # Errors
///
/// Returns `Drone` error if the drone address is invalid or a socket cannot be bound.
pub async fn connect(config: &DroneConfig) -> Result<(TelloHandle, mpsc::Receiver<DroneEvent>)> {
    let drone_addr: SocketAddr = config
        .address
        .parse()
        .map_err(|e| TelloPadError::Drone(format!("Invalid drone address {}: {}", config.address, e)))?;

    let command_socket = bind(config.local_port).await?;
    command_socket
        .connect(drone_addr)
        .await
        .map_err(|e| TelloPadError::Drone(format!("Failed to connect to {}: {}", drone_addr, e)))?;
    let state_socket = bind(config.state_port).await?;
    let video_socket = bind(config.video_port).await?;

    info!("Drone link bound, talking to {}", drone_addr);

    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    tokio::spawn(run_commands(
        Arc::new(command_socket),
        command_rx,
        events_tx.clone(),
        Duration::from_millis(config.connect_retry_ms),
    ));
    tokio::spawn(run_state_listener(state_socket, events_tx.clone()));
    tokio::spawn(run_video_listener(video_socket, events_tx));

    Ok((TelloHandle { tx: command_tx }, events_rx))
}

async fn bind(port: u16) -> Result<UdpSocket> {
    UdpSocket::bind(("0.0.0.0", port))
        .await
        .map_err(|e| TelloPadError::Drone(format!("Failed to bind UDP port {}: {}", port, e)))
}

/// Enters SDK mode, announces the connection, then sends queued commands forever.
pub(crate) async fn run_commands(
    socket: Arc<UdpSocket>,
    mut commands: mpsc::UnboundedReceiver<DroneCommand>,
    events: mpsc::Sender<DroneEvent>,
    retry: Duration,
) {
    handshake(&socket, retry).await;

    info!("Connected");
    if events.send(DroneEvent::Connected).await.is_err() {
        return;
    }

    // Replies to later commands are only logged
    let replies = Arc::clone(&socket);
    tokio::spawn(async move {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        while let Ok(len) = replies.recv(&mut buf).await {
            debug!("Drone replied: {}", String::from_utf8_lossy(&buf[..len]).trim());
        }
    });

    let mut rc = RcState::default();
    while let Some(command) = commands.recv().await {
        let Some(line) = sdk::encode(&command, &mut rc) else {
            debug!("{} has no SDK form, skipped", command);
            continue;
        };
        if let Err(e) = socket.send(line.as_bytes()).await {
            warn!("Failed to send {:?}: {}", line, e);
        }
    }
    debug!("Command channel closed");
}

/// Sends `command` until the drone answers `ok`.
///
/// Socket errors (refused, host or network unreachable) are expected while the
/// drone's Wi-Fi is still coming up and only delay the next attempt.
async fn handshake(socket: &UdpSocket, retry: Duration) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    loop {
        if let Err(e) = socket.send(CMD_ENTER_SDK.as_bytes()).await {
            debug!("Drone not reachable yet: {}", e);
            tokio::time::sleep(retry).await;
            continue;
        }
        match timeout(retry, socket.recv(&mut buf)).await {
            Ok(Ok(len)) => {
                let reply = String::from_utf8_lossy(&buf[..len]);
                if reply.trim() == RESPONSE_OK {
                    return;
                }
                debug!("Unexpected handshake reply: {:?}", reply);
            }
            Ok(Err(e)) => {
                debug!("Drone not reachable yet: {}", e);
                tokio::time::sleep(retry).await;
            }
            Err(_) => debug!("No handshake reply, retrying"),
        }
    }
}

pub(crate) async fn run_state_listener(socket: UdpSocket, events: mpsc::Sender<DroneEvent>) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    loop {
        let len = match socket.recv(&mut buf).await {
            Ok(len) => len,
            Err(e) => {
                warn!("State socket error: {}", e);
                tokio::time::sleep(SOCKET_ERROR_BACKOFF).await;
                continue;
            }
        };
        match sdk::parse_state(&buf[..len]) {
            Ok(data) => {
                if events.send(DroneEvent::FlightData(data)).await.is_err() {
                    return;
                }
            }
            Err(e) => debug!("Dropping state datagram: {}", e),
        }
    }
}

pub(crate) async fn run_video_listener(socket: UdpSocket, events: mpsc::Sender<DroneEvent>) {
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    loop {
        match socket.recv(&mut buf).await {
            Ok(len) => {
                let frame = Bytes::copy_from_slice(&buf[..len]);
                if events.send(DroneEvent::VideoFrame(frame)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!("Video socket error: {}", e);
                tokio::time::sleep(SOCKET_ERROR_BACKOFF).await;
            }
        }
    }
}
