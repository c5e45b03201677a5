//! Gamepad input events as seen by the command router.

use crate::events::Event;

/// Face, shoulder and trigger buttons, named after the PlayStation layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Cross,
    Circle,
    Square,
    Triangle,
    L1,
    L2,
    R1,
    R2,
}

/// Analog stick axes.
///
/// Samples follow the usual joystick convention: negative is left/up, positive
/// is right/down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    LeftX,
    LeftY,
    RightX,
    RightY,
}

/// One gamepad event: a button press or a raw axis sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Button(Button),
    Axis { axis: Axis, value: i16 },
}

/// Handler lookup key: the button or axis an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Button(Button),
    Axis(Axis),
}

impl Event for InputEvent {
    type Kind = InputKind;

    fn kind(&self) -> InputKind {
        match *self {
            InputEvent::Button(button) => InputKind::Button(button),
            InputEvent::Axis { axis, .. } => InputKind::Axis(axis),
        }
    }
}
