//! # Tello SDK Text Protocol
//!
//! Encodes [`DroneCommand`]s into Tello SDK command strings and parses the
//! `key:value;` telemetry datagrams the drone broadcasts.
//!
//! ## Stick state
//!
//! The SDK has a single `rc a b c d` command carrying all four stick axes
//! (left/right, forward/back, up/down, yaw), each in `-100..=100`. [`RcState`]
//! keeps one signed value per axis. A non-zero command points the axis its way,
//! replacing whatever was there, so the latest command wins. A zero command
//! only clears an axis that is idle or already moving its way:
//!
//! ```
//! use tellopad::drone::{Direction, DroneCommand};
//! use tellopad::drone::sdk::{encode, RcState};
//!
//! let mut rc = RcState::default();
//! assert_eq!(encode(&DroneCommand::movement(Direction::Up, 50), &mut rc).as_deref(), Some("rc 0 0 50 0"));
//! // Zeroing the opposite direction keeps the climb
//! assert_eq!(encode(&DroneCommand::movement(Direction::Down, 0), &mut rc).as_deref(), Some("rc 0 0 50 0"));
//! // A later descent replaces it
//! assert_eq!(encode(&DroneCommand::movement(Direction::Down, 30), &mut rc).as_deref(), Some("rc 0 0 -30 0"));
//! ```

use std::collections::HashMap;

use super::{Direction, DroneCommand, FlightData, FlipDirection, VideoBitRate};
use crate::error::{Result, TelloPadError};

/// Enters SDK mode; the drone answers `ok`.
pub const CMD_ENTER_SDK: &str = "command";

/// Reply to a successful command.
pub const RESPONSE_OK: &str = "ok";

/// Signed stick values (-100..=100 each).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RcState {
    left_right: i16,
    forward_back: i16,
    up_down: i16,
    yaw: i16,
}

impl RcState {
    /// Applies one directional command to its axis.
    pub fn set(&mut self, direction: Direction, magnitude: u8) {
        let (slot, sign) = match direction {
            Direction::Right => (&mut self.left_right, 1),
            Direction::Left => (&mut self.left_right, -1),
            Direction::Forward => (&mut self.forward_back, 1),
            Direction::Backward => (&mut self.forward_back, -1),
            Direction::Up => (&mut self.up_down, 1),
            Direction::Down => (&mut self.up_down, -1),
            Direction::Clockwise => (&mut self.yaw, 1),
            Direction::CounterClockwise => (&mut self.yaw, -1),
        };
        let magnitude = i16::from(magnitude.min(super::MAX_MAGNITUDE));
        if magnitude > 0 {
            *slot = sign * magnitude;
        } else if slot.signum() != -sign {
            *slot = 0;
        }
    }

    /// Stick values as `(left_right, forward_back, up_down, yaw)`.
    #[must_use]
    pub fn axes(&self) -> (i16, i16, i16, i16) {
        (self.left_right, self.forward_back, self.up_down, self.yaw)
    }

    /// `rc` command line for the current state.
    #[must_use]
    pub fn to_command(&self) -> String {
        let (lr, fb, ud, yaw) = self.axes();
        format!("rc {} {} {} {}", lr, fb, ud, yaw)
    }
}

/// Encodes a command as an SDK string, updating `rc` for directional commands.
///
/// Returns `None` for commands the SDK has no text form for (exposure).
pub fn encode(command: &DroneCommand, rc: &mut RcState) -> Option<String> {
    match command {
        DroneCommand::TakeOff => Some("takeoff".to_string()),
        DroneCommand::Land => Some("land".to_string()),
        DroneCommand::Flip(flip) => {
            let code = match flip {
                FlipDirection::Front => 'f',
                FlipDirection::Back => 'b',
                FlipDirection::Left => 'l',
                FlipDirection::Right => 'r',
            };
            Some(format!("flip {}", code))
        }
        DroneCommand::StartVideo => Some("streamon".to_string()),
        DroneCommand::SetVideoEncoderRate(rate) => {
            let code = match rate {
                VideoBitRate::Auto => 0,
                VideoBitRate::Mbps(mbps) => *mbps,
            };
            Some(format!("setbitrate {}", code))
        }
        DroneCommand::SetExposure(_) => None,
        DroneCommand::Move { direction, magnitude } => {
            rc.set(*direction, *magnitude);
            Some(rc.to_command())
        }
    }
}

/// Parses one telemetry datagram such as
/// `"pitch:0;roll:0;yaw:0;...;templ:60;temph:63;tof:10;h:0;bat:87;...;time:0;"`.
///
/// # Errors
///
/// Returns `Drone` error if the datagram is not UTF-8 or carries no battery field.
pub fn parse_state(datagram: &[u8]) -> Result<FlightData> {
    let text = std::str::from_utf8(datagram)
        .map_err(|e| TelloPadError::Drone(format!("State datagram is not UTF-8: {}", e)))?;

    let fields: HashMap<&str, &str> = text
        .trim()
        .split(';')
        .filter_map(|pair| pair.split_once(':'))
        .map(|(k, v)| (k.trim(), v.trim()))
        .collect();

    let battery = fields
        .get("bat")
        .and_then(|v| v.parse::<i32>().ok())
        .ok_or_else(|| TelloPadError::Drone(format!("State datagram has no battery field: {:?}", text)))?;

    let number = |key: &str| fields.get(key).and_then(|v| v.parse::<i32>().ok()).unwrap_or(0);

    Ok(FlightData {
        battery_percentage: battery.clamp(0, 100) as u8,
        height_cm: number("h").clamp(i16::MIN as i32, i16::MAX as i32) as i16,
        flight_time_s: number("time").max(0) as u32,
        temperature_low_c: number("templ").clamp(i16::MIN as i32, i16::MAX as i32) as i16,
        temperature_high_c: number("temph").clamp(i16::MIN as i32, i16::MAX as i32) as i16,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::geometry::{corrections, CorrectionSpeeds, PixelBox};

    const STATE: &[u8] = b"mid:-1;x:0;y:0;z:0;mpry:0,0,0;pitch:0;roll:0;yaw:0;vgx:0;vgy:0;vgz:0;templ:60;temph:63;tof:10;h:30;bat:87;baro:12.34;time:15;agx:0.00;agy:0.00;agz:-1000.00;\r\n";

    #[test]
    fn test_encode_actions() {
        let mut rc = RcState::default();
        assert_eq!(encode(&DroneCommand::TakeOff, &mut rc).as_deref(), Some("takeoff"));
        assert_eq!(encode(&DroneCommand::Land, &mut rc).as_deref(), Some("land"));
        assert_eq!(encode(&DroneCommand::StartVideo, &mut rc).as_deref(), Some("streamon"));
        assert_eq!(rc, RcState::default());
    }

    #[test]
    fn test_encode_flips() {
        let mut rc = RcState::default();
        for (flip, expected) in [
            (FlipDirection::Front, "flip f"),
            (FlipDirection::Back, "flip b"),
            (FlipDirection::Left, "flip l"),
            (FlipDirection::Right, "flip r"),
        ] {
            assert_eq!(encode(&DroneCommand::Flip(flip), &mut rc).as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_encode_bit_rate() {
        let mut rc = RcState::default();
        assert_eq!(
            encode(&DroneCommand::SetVideoEncoderRate(VideoBitRate::Auto), &mut rc).as_deref(),
            Some("setbitrate 0")
        );
        assert_eq!(
            encode(&DroneCommand::SetVideoEncoderRate(VideoBitRate::Mbps(4)), &mut rc).as_deref(),
            Some("setbitrate 4")
        );
    }

    #[test]
    fn test_exposure_has_no_text_form() {
        let mut rc = RcState::default();
        assert_eq!(encode(&DroneCommand::SetExposure(0), &mut rc), None);
    }

    #[test]
    fn test_rc_axes_order() {
        let mut rc = RcState::default();
        encode(&DroneCommand::movement(Direction::Right, 10), &mut rc);
        encode(&DroneCommand::movement(Direction::Backward, 20), &mut rc);
        encode(&DroneCommand::movement(Direction::Down, 30), &mut rc);
        let line = encode(&DroneCommand::movement(Direction::CounterClockwise, 40), &mut rc);
        assert_eq!(line.as_deref(), Some("rc 10 -20 -30 -40"));
    }

    #[test]
    fn test_rc_pair_reversal() {
        let mut rc = RcState::default();
        encode(&DroneCommand::movement(Direction::Clockwise, 50), &mut rc);
        encode(&DroneCommand::movement(Direction::CounterClockwise, 0), &mut rc);
        assert_eq!(rc.axes().3, 50);

        // Stick swings the other way
        encode(&DroneCommand::movement(Direction::CounterClockwise, 30), &mut rc);
        encode(&DroneCommand::movement(Direction::Clockwise, 0), &mut rc);
        assert_eq!(rc.axes().3, -30);
    }

    #[test]
    fn test_rc_latest_direction_wins() {
        let mut rc = RcState::default();
        encode(&DroneCommand::movement(Direction::CounterClockwise, 100), &mut rc);
        let line = encode(&DroneCommand::movement(Direction::Clockwise, 50), &mut rc);
        assert_eq!(line.as_deref(), Some("rc 0 0 0 50"));

        // Zeroing the side that is not active leaves the axis alone
        encode(&DroneCommand::movement(Direction::CounterClockwise, 0), &mut rc);
        assert_eq!(rc.axes().3, 50);
    }

    #[test]
    fn test_rc_follows_tracking_corrections() {
        let speeds = CorrectionSpeeds { yaw: 50, altitude: 25 };
        // Face high on the left, then low on the right of a 360x240 frame
        let left_high = PixelBox { left: 20.0, top: 10.0, right: 80.0, bottom: 60.0 };
        let right_low = PixelBox { left: 280.0, top: 180.0, right: 340.0, bottom: 230.0 };

        let mut rc = RcState::default();
        let mut last = None;
        for command in corrections(&left_high, 360, 240, speeds)
            .into_iter()
            .chain(corrections(&right_low, 360, 240, speeds))
        {
            last = encode(&command, &mut rc);
        }
        assert_eq!(last.as_deref(), Some("rc 0 0 -25 50"));
    }

    #[test]
    fn test_rc_explicit_stop() {
        let mut rc = RcState::default();
        encode(&DroneCommand::movement(Direction::Up, 25), &mut rc);
        encode(&DroneCommand::movement(Direction::Up, 0), &mut rc);
        encode(&DroneCommand::movement(Direction::Down, 0), &mut rc);
        assert_eq!(rc.to_command(), "rc 0 0 0 0");
    }

    #[test]
    fn test_parse_state() {
        let data = parse_state(STATE).unwrap();
        assert_eq!(data.battery_percentage, 87);
        assert_eq!(data.height_cm, 30);
        assert_eq!(data.flight_time_s, 15);
        assert_eq!(data.temperature_low_c, 60);
        assert_eq!(data.temperature_high_c, 63);
    }

    #[test]
    fn test_parse_state_missing_battery() {
        assert!(matches!(
            parse_state(b"pitch:0;roll:0;h:10;"),
            Err(TelloPadError::Drone(_))
        ));
    }

    #[test]
    fn test_parse_state_not_utf8() {
        assert!(parse_state(&[0xff, 0xfe, 0xfd]).is_err());
    }

    #[test]
    fn test_parse_state_clamps_battery() {
        assert_eq!(parse_state(b"bat:140;").unwrap().battery_percentage, 100);
        assert_eq!(parse_state(b"bat:-3;").unwrap().battery_percentage, 0);
    }
}
