//! # Video Pipeline
//!
//! Everything between the drone's video packets and an external process:
//!
//! - [`DecoderProcess`]: the player (`mplayer`) or decoder (`ffmpeg`) child with a
//!   piped stdin and, for the decoder, a piped stdout
//! - [`VideoRelay`]: writes each packet to the child's stdin in arrival order
//! - [`spawn_heartbeat`]: re-issues `StartVideo` on a fixed period so the drone
//!   keeps streaming

use bytes::Bytes;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::drone::{Actuator, DroneCommand};
use crate::error::{Result, TelloPadError};

/// Arguments for an ffmpeg process that turns the H.264 stream on stdin into
/// packed BGR24 frames of `width`x`height` on stdout.
#[must_use]
pub fn decoder_args(width: u32, height: u32) -> Vec<String> {
    [
        "-hwaccel",
        "auto",
        "-hwaccel_device",
        "opencl",
        "-i",
        "pipe:0",
        "-pix_fmt",
        "bgr24",
        "-s",
        &format!("{}x{}", width, height),
        "-f",
        "rawvideo",
        "pipe:1",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect()
}

/// A running external video process.
///
/// The child is killed when this handle is dropped.
#[derive(Debug)]
pub struct DecoderProcess {
    child: Child,
}

impl DecoderProcess {
    /// Starts `program` with a piped stdin; stdout is piped only if `capture_output`.
    ///
    /// # Errors
    ///
    /// Returns `Decoder` error if the process cannot be started.
    pub fn spawn(program: &str, args: &[String], capture_output: bool) -> Result<Self> {
        let stdout = if capture_output {
            Stdio::piped()
        } else {
            Stdio::inherit()
        };

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(stdout)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TelloPadError::Decoder(format!("Failed to start {}: {}", program, e)))?;

        info!("Started {} (pid {:?})", program, child.id());
        Ok(Self { child })
    }

    /// Starts the player from a `[program, args...]` command line.
    ///
    /// # Errors
    ///
    /// Returns `Decoder` error if the command line is empty or the process cannot be started.
    pub fn spawn_player(command_line: &[String]) -> Result<Self> {
        let (program, args) = command_line
            .split_first()
            .ok_or_else(|| TelloPadError::Decoder("Empty player command".to_string()))?;
        Self::spawn(program, args, false)
    }

    /// # Errors
    ///
    /// Returns `Decoder` error if stdin was already taken.
    pub fn take_stdin(&mut self) -> Result<ChildStdin> {
        self.child
            .stdin
            .take()
            .ok_or_else(|| TelloPadError::Decoder("stdin already taken".to_string()))
    }

    /// # Errors
    ///
    /// Returns `Decoder` error if stdout was not captured or was already taken.
    pub fn take_stdout(&mut self) -> Result<ChildStdout> {
        self.child
            .stdout
            .take()
            .ok_or_else(|| TelloPadError::Decoder("stdout not captured".to_string()))
    }

    pub async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            debug!("Decoder already stopped: {}", e);
        }
    }
}

/// Frame counters reported when the relay stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub written: u64,
    pub dropped: u64,
}

/// Copies video packets into the external process, one at a time, in order.
#[derive(Debug, Default)]
pub struct VideoRelay {
    stats: RelayStats,
}

impl VideoRelay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one packet. A failed write is logged and the packet is dropped;
    /// the relay keeps going with the next one.
    pub async fn relay<W: AsyncWrite + Unpin>(&mut self, writer: &mut W, frame: &[u8]) {
        match writer.write_all(frame).await {
            Ok(()) => self.stats.written += 1,
            Err(e) => {
                self.stats.dropped += 1;
                error!("Video write failed, dropping {} bytes: {}", frame.len(), e);
            }
        }
    }

    /// Relays packets from `rx` until the channel closes.
    pub async fn run<W: AsyncWrite + Unpin>(mut self, mut rx: mpsc::Receiver<Bytes>, mut writer: W) -> RelayStats {
        while let Some(frame) = rx.recv().await {
            self.relay(&mut writer, &frame).await;
        }
        info!(
            "Video relay stopped ({} written, {} dropped)",
            self.stats.written, self.stats.dropped
        );
        self.stats
    }
}

/// Issues `StartVideo` every `period` until the task is aborted.
///
/// The first issuance happens one period after the call.
pub fn spawn_heartbeat(actuator: Arc<dyn Actuator>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() completes its first tick immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            actuator.issue(DroneCommand::StartVideo);
        }
    })
}
