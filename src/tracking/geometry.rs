//! Bounding-box geometry for tracking corrections.
//!
//! Corrections are fixed-magnitude: a box off to one side gets the full yaw or
//! altitude speed regardless of how far off it is. This is a known limitation of
//! the tracker, not a proportional controller.

use super::detector::BoundingBox;
use crate::drone::{Direction, DroneCommand};

/// A detection box in frame pixels, clamped to `[0, width-1] x [0, height-1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl PixelBox {
    /// Scales a normalized box to a `width` x `height` frame and clamps each edge.
    #[must_use]
    pub fn from_normalized(bbox: &BoundingBox, width: u32, height: u32) -> Self {
        let w = width as f32;
        let h = height as f32;
        Self {
            left: clamp_edge(bbox.left * w, w),
            top: clamp_edge(bbox.top * h, h),
            right: clamp_edge(bbox.right * w, w),
            bottom: clamp_edge(bbox.bottom * h, h),
        }
    }
}

/// Clamps a pixel coordinate to `[0, extent - 1]`.
#[inline]
#[must_use]
pub fn clamp_edge(value: f32, extent: f32) -> f32 {
    value.max(0.0).min(extent - 1.0)
}

/// Speeds used for tracking corrections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrectionSpeeds {
    pub yaw: u8,
    pub altitude: u8,
}

/// Yaw then altitude commands that steer the drone toward `pixel_box`.
///
/// Each axis yields either one full-speed command or an explicit stop of both
/// directions when the box straddles the frame center.
#[must_use]
pub fn corrections(pixel_box: &PixelBox, width: u32, height: u32, speeds: CorrectionSpeeds) -> Vec<DroneCommand> {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let mut commands = Vec::with_capacity(4);

    if pixel_box.left > center_x {
        commands.push(DroneCommand::movement(Direction::Clockwise, speeds.yaw));
    } else if pixel_box.right < center_x {
        commands.push(DroneCommand::movement(Direction::CounterClockwise, speeds.yaw));
    } else {
        commands.push(DroneCommand::movement(Direction::Clockwise, 0));
        commands.push(DroneCommand::movement(Direction::CounterClockwise, 0));
    }

    if pixel_box.bottom > center_y {
        commands.push(DroneCommand::movement(Direction::Down, speeds.altitude));
    } else if pixel_box.top < center_y {
        commands.push(DroneCommand::movement(Direction::Up, speeds.altitude));
    } else {
        commands.push(DroneCommand::movement(Direction::Up, 0));
        commands.push(DroneCommand::movement(Direction::Down, 0));
    }

    commands
}
