//! # Drone Module
//!
//! Command, telemetry and event types shared by everything that talks to the drone,
//! plus the [`Actuator`] seam that the router, the lifecycle manager and the
//! tracking loop all issue commands through.
//!
//! The concrete collaborator is the Tello UDP link in [`tello`]; the text
//! encoding it speaks lives in [`sdk`].

pub mod sdk;
pub mod tello;

use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::events::Event;

/// Largest magnitude a directional command can carry.
pub const MAX_MAGNITUDE: u8 = 100;

/// One side of a directional pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
    Clockwise,
    CounterClockwise,
}

/// Flip manoeuvres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlipDirection {
    Front,
    Back,
    Left,
    Right,
}

/// Video encoder bit rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoBitRate {
    /// Let the drone pick the rate from link quality
    Auto,
    /// Fixed rate in Mbps (1-5)
    Mbps(u8),
}

impl FromStr for VideoBitRate {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(VideoBitRate::Auto);
        }
        match s.parse::<u8>() {
            Ok(mbps @ 1..=5) => Ok(VideoBitRate::Mbps(mbps)),
            _ => Err(format!(
                "encoder_rate must be \"auto\" or 1-5 (Mbps), got \"{}\"",
                s
            )),
        }
    }
}

/// A command for the drone.
///
/// Directional commands carry a magnitude in `0..=100`; everything else has no
/// payload beyond its own settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DroneCommand {
    TakeOff,
    Land,
    Move { direction: Direction, magnitude: u8 },
    Flip(FlipDirection),
    StartVideo,
    SetVideoEncoderRate(VideoBitRate),
    SetExposure(i8),
}

impl DroneCommand {
    /// Directional command with the magnitude clamped to [`MAX_MAGNITUDE`].
    #[must_use]
    pub fn movement(direction: Direction, magnitude: u8) -> Self {
        DroneCommand::Move {
            direction,
            magnitude: magnitude.min(MAX_MAGNITUDE),
        }
    }
}

impl fmt::Display for DroneCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DroneCommand::Move { direction, magnitude } => write!(f, "{:?}({})", direction, magnitude),
            DroneCommand::Flip(flip) => write!(f, "{:?}Flip", flip),
            DroneCommand::SetVideoEncoderRate(rate) => write!(f, "SetVideoEncoderRate({:?})", rate),
            DroneCommand::SetExposure(level) => write!(f, "SetExposure({})", level),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Telemetry snapshot reported by the drone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlightData {
    /// Remaining battery (0-100%)
    pub battery_percentage: u8,
    /// Height above take-off point in cm
    pub height_cm: i16,
    /// Motor-on time in seconds
    pub flight_time_s: u32,
    pub temperature_low_c: i16,
    pub temperature_high_c: i16,
}

/// Events emitted by the drone collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum DroneEvent {
    /// The drone acknowledged the link
    Connected,
    FlightData(FlightData),
    /// One compressed transport-layer video packet
    VideoFrame(Bytes),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DroneEventKind {
    Connected,
    FlightData,
    VideoFrame,
}

impl Event for DroneEvent {
    type Kind = DroneEventKind;

    fn kind(&self) -> DroneEventKind {
        match self {
            DroneEvent::Connected => DroneEventKind::Connected,
            DroneEvent::FlightData(_) => DroneEventKind::FlightData,
            DroneEvent::VideoFrame(_) => DroneEventKind::VideoFrame,
        }
    }
}

/// The drone's actuator surface.
///
/// Every issuance is fire-and-forget: there is no acknowledgement, no retry, no
/// queue ordering across callers and no compare-and-set. Several activities (the
/// command router, the heartbeat, the tracking loop) issue through the same
/// actuator without coordination, so the last write wins and there is no
/// atomicity across the two halves of a directional pair.
#[cfg_attr(test, mockall::automock)]
pub trait Actuator: Send + Sync {
    fn issue(&self, command: DroneCommand);
}
