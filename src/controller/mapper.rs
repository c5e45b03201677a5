//! # Controller Input Mapper Module
//!
//! Translates raw evdev events from the gamepad into [`InputEvent`]s.
//!
//! ## Event Types
//!
//! - **EV_KEY (Key/Button)**: a press (value 1) becomes [`InputEvent::Button`];
//!   releases and auto-repeats are dropped
//! - **EV_ABS (Absolute Axis)**: stick samples become [`InputEvent::Axis`] with
//!   the raw value rescaled from the device range to `-32768..=32767`
//! - Everything else (sync, gyro, touchpad, d-pad) is ignored
//!
//! ## Usage
//!
//! ```no_run
//! use tellopad::controller::gamepad::Gamepad;
//! use tellopad::controller::mapper::EventMapper;
//! use tellopad::controller::profile::ControllerModel;
//!
//! let profile = ControllerModel::DualShock4.profile();
//! let mut gamepad = Gamepad::open(profile)?;
//! let mapper = EventMapper::new(profile, 0, 255);
//!
//! loop {
//!     for event in gamepad.fetch_events()? {
//!         if let Some(input) = mapper.map(&event) {
//!             println!("{:?}", input);
//!         }
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use evdev::InputEventKind;

use super::event::InputEvent;
use super::profile::ControllerProfile;

/// Key event value for a press.
pub const KEY_PRESSED: i32 = 1;

/// Rescales a raw axis value from `[min, max]` to the signed 16-bit range.
///
/// `min` maps to `-32768`, `max` to `32767` and values outside the range are
/// clamped.
///
/// # Examples
///
/// ```
/// use tellopad::controller::mapper::normalize_axis;
///
/// assert_eq!(normalize_axis(0, 0, 255), -32768);
/// assert_eq!(normalize_axis(255, 0, 255), 32767);
/// ```
#[must_use]
pub fn normalize_axis(value: i32, min: i32, max: i32) -> i16 {
    let span = i64::from(max) - i64::from(min);
    if span <= 0 {
        return 0;
    }
    let offset = 2 * i64::from(value) - (i64::from(min) + i64::from(max));
    let scaled = offset * 32768 / span;
    scaled.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16
}

/// Stateless translator from evdev events to [`InputEvent`]s.
#[derive(Debug, Clone, Copy)]
pub struct EventMapper {
    profile: ControllerProfile,
    axis_min: i32,
    axis_max: i32,
}

impl EventMapper {
    /// Creates a mapper for one controller model and its raw stick range.
    #[must_use]
    pub fn new(profile: ControllerProfile, axis_min: i32, axis_max: i32) -> Self {
        Self {
            profile,
            axis_min,
            axis_max,
        }
    }

    /// Translates one evdev event, or returns `None` if the router has no use for it.
    #[must_use]
    pub fn map(&self, event: &evdev::InputEvent) -> Option<InputEvent> {
        match event.kind() {
            InputEventKind::Key(key) if event.value() == KEY_PRESSED => {
                self.profile.button(key).map(InputEvent::Button)
            }
            InputEventKind::AbsAxis(code) => self.profile.axis(code).map(|axis| InputEvent::Axis {
                axis,
                value: normalize_axis(event.value(), self.axis_min, self.axis_max),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::event::{Axis, Button};
    use crate::controller::profile::ControllerModel;
    use evdev::{AbsoluteAxisType, EventType, Key};

    /// Helper to create an axis event for testing.
    fn make_axis_event(axis: AbsoluteAxisType, value: i32) -> evdev::InputEvent {
        evdev::InputEvent::new(EventType::ABSOLUTE, axis.0, value)
    }

    /// Helper to create a key event for testing.
    fn make_key_event(key: Key, value: i32) -> evdev::InputEvent {
        evdev::InputEvent::new(EventType::KEY, key.code(), value)
    }

    fn ds4_mapper() -> EventMapper {
        EventMapper::new(ControllerModel::DualShock4.profile(), 0, 255)
    }

    // ==================== Normalization Tests ====================

    #[test]
    fn test_normalize_extremes() {
        assert_eq!(normalize_axis(0, 0, 255), i16::MIN);
        assert_eq!(normalize_axis(255, 0, 255), i16::MAX);
    }

    #[test]
    fn test_normalize_center_is_near_zero() {
        assert!(normalize_axis(128, 0, 255).abs() < 200);
        assert!(normalize_axis(127, 0, 255).abs() < 200);
    }

    #[test]
    fn test_normalize_clamps_out_of_range() {
        assert_eq!(normalize_axis(-50, 0, 255), i16::MIN);
        assert_eq!(normalize_axis(300, 0, 255), i16::MAX);
    }

    #[test]
    fn test_normalize_signed_range_is_identity_like() {
        assert_eq!(normalize_axis(0, -32768, 32767), 0);
        assert_eq!(normalize_axis(-32768, -32768, 32767), i16::MIN);
        assert_eq!(normalize_axis(32767, -32768, 32767), i16::MAX);
    }

    #[test]
    fn test_normalize_degenerate_range() {
        assert_eq!(normalize_axis(10, 5, 5), 0);
    }

    // ==================== Key Event Tests ====================

    #[test]
    fn test_button_press() {
        let mapper = ds4_mapper();
        assert_eq!(
            mapper.map(&make_key_event(Key::BTN_NORTH, 1)),
            Some(InputEvent::Button(Button::Triangle))
        );
        assert_eq!(
            mapper.map(&make_key_event(Key::BTN_TR2, 1)),
            Some(InputEvent::Button(Button::R2))
        );
    }

    #[test]
    fn test_button_release_and_repeat_ignored() {
        let mapper = ds4_mapper();
        assert_eq!(mapper.map(&make_key_event(Key::BTN_NORTH, 0)), None);
        assert_eq!(mapper.map(&make_key_event(Key::BTN_NORTH, 2)), None);
    }

    #[test]
    fn test_unknown_button_ignored() {
        let mapper = ds4_mapper();
        assert_eq!(mapper.map(&make_key_event(Key::BTN_MODE, 1)), None);
    }

    // ==================== Axis Event Tests ====================

    #[test]
    fn test_left_stick_up_is_negative() {
        let mapper = ds4_mapper();
        assert_eq!(
            mapper.map(&make_axis_event(AbsoluteAxisType::ABS_Y, 0)),
            Some(InputEvent::Axis { axis: Axis::LeftY, value: i16::MIN })
        );
    }

    #[test]
    fn test_right_stick_full_right() {
        let mapper = ds4_mapper();
        assert_eq!(
            mapper.map(&make_axis_event(AbsoluteAxisType::ABS_RX, 255)),
            Some(InputEvent::Axis { axis: Axis::RightX, value: i16::MAX })
        );
    }

    #[test]
    fn test_dualsense_right_stick() {
        let mapper = EventMapper::new(ControllerModel::DualSense.profile(), 0, 255);
        assert!(matches!(
            mapper.map(&make_axis_event(AbsoluteAxisType::ABS_RZ, 0)),
            Some(InputEvent::Axis { axis: Axis::RightY, .. })
        ));
    }

    #[test]
    fn test_unmapped_axis_ignored() {
        let mapper = ds4_mapper();
        assert_eq!(mapper.map(&make_axis_event(AbsoluteAxisType::ABS_HAT0X, 1)), None);
        assert_eq!(mapper.map(&make_axis_event(AbsoluteAxisType::ABS_MISC, 100)), None);
    }

    #[test]
    fn test_sync_events_ignored() {
        let mapper = ds4_mapper();
        let event = evdev::InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
        assert_eq!(mapper.map(&event), None);
    }
}
