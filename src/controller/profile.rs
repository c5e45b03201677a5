//! # Controller Profiles
//!
//! Static per-model tables: USB ids used for auto-detection and the evdev codes
//! each model reports for the buttons and sticks the router cares about.
//!
//! | Model | Vendor | Products | Right stick |
//! |-------|--------|----------|-------------|
//! | `dualshock4` | 0x054c | 0x05c4, 0x09cc | ABS_RX / ABS_RY |
//! | `dualsense` | 0x054c | 0x0ce6 | ABS_Z / ABS_RZ |
//!
//! Both models report the face buttons as BTN_SOUTH (Cross), BTN_EAST (Circle),
//! BTN_WEST (Square), BTN_NORTH (Triangle) and the shoulders as BTN_TL/BTN_TR
//! (L1/R1) and BTN_TL2/BTN_TR2 (L2/R2 clicks).

use evdev::{AbsoluteAxisType, Key};
use std::fmt;
use std::str::FromStr;

use super::event::{Axis, Button};

/// Sony vendor ID
pub const SONY_VENDOR_ID: u16 = 0x054c;

/// DualShock 4 product IDs (first and second revision)
pub const DUALSHOCK4_PRODUCT_IDS: &[u16] = &[0x05c4, 0x09cc];

/// DualSense product ID (wired and Bluetooth)
pub const DUALSENSE_PRODUCT_IDS: &[u16] = &[0x0ce6];

/// Supported gamepad models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerModel {
    DualShock4,
    DualSense,
}

impl FromStr for ControllerModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dualshock4" | "ds4" => Ok(ControllerModel::DualShock4),
            "dualsense" | "ps5" => Ok(ControllerModel::DualSense),
            other => Err(format!(
                "unknown controller model \"{}\" (expected dualshock4 or dualsense)",
                other
            )),
        }
    }
}

impl fmt::Display for ControllerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerModel::DualShock4 => write!(f, "DualShock 4"),
            ControllerModel::DualSense => write!(f, "DualSense"),
        }
    }
}

impl ControllerModel {
    #[must_use]
    pub fn profile(self) -> ControllerProfile {
        match self {
            ControllerModel::DualShock4 => ControllerProfile {
                model: self,
                product_ids: DUALSHOCK4_PRODUCT_IDS,
                right_x: AbsoluteAxisType::ABS_RX,
                right_y: AbsoluteAxisType::ABS_RY,
            },
            ControllerModel::DualSense => ControllerProfile {
                model: self,
                product_ids: DUALSENSE_PRODUCT_IDS,
                right_x: AbsoluteAxisType::ABS_Z,
                right_y: AbsoluteAxisType::ABS_RZ,
            },
        }
    }
}

/// evdev code tables for one controller model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerProfile {
    pub model: ControllerModel,
    product_ids: &'static [u16],
    right_x: AbsoluteAxisType,
    right_y: AbsoluteAxisType,
}

impl ControllerProfile {
    /// Whether a device with these USB ids is this model.
    #[must_use]
    pub fn matches(&self, vendor: u16, product: u16) -> bool {
        vendor == SONY_VENDOR_ID && self.product_ids.contains(&product)
    }

    #[must_use]
    pub fn button(&self, key: Key) -> Option<Button> {
        match key {
            Key::BTN_SOUTH => Some(Button::Cross),
            Key::BTN_EAST => Some(Button::Circle),
            Key::BTN_WEST => Some(Button::Square),
            Key::BTN_NORTH => Some(Button::Triangle),
            Key::BTN_TL => Some(Button::L1),
            Key::BTN_TL2 => Some(Button::L2),
            Key::BTN_TR => Some(Button::R1),
            Key::BTN_TR2 => Some(Button::R2),
            _ => None,
        }
    }

    #[must_use]
    pub fn axis(&self, code: AbsoluteAxisType) -> Option<Axis> {
        if code == AbsoluteAxisType::ABS_X {
            Some(Axis::LeftX)
        } else if code == AbsoluteAxisType::ABS_Y {
            Some(Axis::LeftY)
        } else if code == self.right_x {
            Some(Axis::RightX)
        } else if code == self.right_y {
            Some(Axis::RightY)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_parsing() {
        assert_eq!("dualshock4".parse::<ControllerModel>(), Ok(ControllerModel::DualShock4));
        assert_eq!("DualSense".parse::<ControllerModel>(), Ok(ControllerModel::DualSense));
        assert!("xbox".parse::<ControllerModel>().is_err());
    }

    #[test]
    fn test_sony_vendor_id() {
        assert_eq!(SONY_VENDOR_ID, 0x054c, "Sony vendor ID should be 0x054c");
    }

    #[test]
    fn test_matches() {
        let ds4 = ControllerModel::DualShock4.profile();
        assert!(ds4.matches(0x054c, 0x05c4));
        assert!(ds4.matches(0x054c, 0x09cc));
        assert!(!ds4.matches(0x054c, 0x0ce6));
        assert!(!ds4.matches(0x045e, 0x05c4));

        let dualsense = ControllerModel::DualSense.profile();
        assert!(dualsense.matches(0x054c, 0x0ce6));
    }

    #[test]
    fn test_buttons() {
        let profile = ControllerModel::DualShock4.profile();
        assert_eq!(profile.button(Key::BTN_NORTH), Some(Button::Triangle));
        assert_eq!(profile.button(Key::BTN_SOUTH), Some(Button::Cross));
        assert_eq!(profile.button(Key::BTN_EAST), Some(Button::Circle));
        assert_eq!(profile.button(Key::BTN_TL2), Some(Button::L2));
        assert_eq!(profile.button(Key::BTN_MODE), None);
    }

    #[test]
    fn test_right_stick_codes_differ_per_model() {
        let ds4 = ControllerModel::DualShock4.profile();
        let dualsense = ControllerModel::DualSense.profile();

        assert_eq!(ds4.axis(AbsoluteAxisType::ABS_RX), Some(Axis::RightX));
        assert_eq!(ds4.axis(AbsoluteAxisType::ABS_Z), None);
        assert_eq!(dualsense.axis(AbsoluteAxisType::ABS_Z), Some(Axis::RightX));
        assert_eq!(dualsense.axis(AbsoluteAxisType::ABS_RZ), Some(Axis::RightY));

        for profile in [ds4, dualsense] {
            assert_eq!(profile.axis(AbsoluteAxisType::ABS_X), Some(Axis::LeftX));
            assert_eq!(profile.axis(AbsoluteAxisType::ABS_Y), Some(Axis::LeftY));
            assert_eq!(profile.axis(AbsoluteAxisType::ABS_HAT0X), None);
        }
    }
}
