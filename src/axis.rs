//! # Axis Scaler
//!
//! Converts a signed 16-bit stick sample into a drone command magnitude.
//!
//! `m = min(100, round(|v| / 32768 * 100))`
//!
//! There is no deadzone and no expo: the sign of the sample picks one side of a
//! [`DirectionalPair`], the magnitude goes to that side and the opposite side is
//! explicitly zeroed.
//!
//! ```
//! use tellopad::axis::{scale, DirectionalPair};
//! use tellopad::drone::{Direction, DroneCommand};
//!
//! assert_eq!(scale(-16384), 50);
//!
//! let vertical = DirectionalPair::new(Direction::Down, Direction::Up);
//! assert_eq!(
//!     vertical.resolve(-16384),
//!     [DroneCommand::movement(Direction::Up, 50), DroneCommand::movement(Direction::Down, 0)]
//! );
//! ```

use crate::drone::{Direction, DroneCommand, MAX_MAGNITUDE};

/// Full-scale reference magnitude for a 16-bit axis.
pub const AXIS_REFERENCE: u32 = 32768;

/// Scales a raw sample to `0..=100`.
#[inline]
#[must_use]
pub fn scale(raw: i16) -> u8 {
    let abs = (raw as i32).unsigned_abs();
    // Integer rounding: (abs * 100 + ref/2) / ref
    let scaled = (abs * MAX_MAGNITUDE as u32 + AXIS_REFERENCE / 2) / AXIS_REFERENCE;
    scaled.min(MAX_MAGNITUDE as u32) as u8
}

/// Two opposite directions driven by the sign of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionalPair {
    /// Receives the magnitude for samples `>= 0`
    pub positive: Direction,
    /// Receives the magnitude for samples `< 0`
    pub negative: Direction,
}

impl DirectionalPair {
    #[must_use]
    pub const fn new(positive: Direction, negative: Direction) -> Self {
        Self { positive, negative }
    }

    /// The active command followed by the zeroed opposite, in issue order.
    #[must_use]
    pub fn resolve(&self, raw: i16) -> [DroneCommand; 2] {
        let (active, idle) = if raw >= 0 {
            (self.positive, self.negative)
        } else {
            (self.negative, self.positive)
        };
        [
            DroneCommand::movement(active, scale(raw)),
            DroneCommand::movement(idle, 0),
        ]
    }
}
