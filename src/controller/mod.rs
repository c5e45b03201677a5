//! # Controller Module
//!
//! Gamepad input handling.
//!
//! This module handles:
//! - Controller model profiles (USB ids, evdev button/axis codes)
//! - Controller detection and connection via evdev
//! - Translating raw evdev events into button presses and signed 16-bit axis samples

pub mod event;
pub mod gamepad;
pub mod mapper;
pub mod profile;
