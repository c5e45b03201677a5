//! # TelloPad Library
//!
//! Fly a DJI Tello with a DualShock 4 or DualSense gamepad.
//!
//! This library provides the pieces both binaries are built from: the command
//! router that turns gamepad events into drone commands, the video relay and
//! heartbeat that keep the drone's H.264 stream flowing into an external player
//! or decoder, the connection lifecycle, and the vision tracking loop.

pub mod app;
pub mod axis;
pub mod cli;
pub mod config;
pub mod controller;
pub mod drone;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod router;
pub mod telemetry;
pub mod tracking;
pub mod video;
