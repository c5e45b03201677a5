//! # Command Router
//!
//! Binds gamepad events to drone commands.
//!
//! ## Buttons
//!
//! | Button | Action |
//! |--------|--------|
//! | Triangle | TakeOff |
//! | Cross | Land |
//! | Circle | Log the last reported battery level |
//! | L1 / L2 | Front / Back flip |
//! | R1 / R2 | Right / Left flip |
//!
//! ## Sticks
//!
//! | Axis | Positive sample | Negative sample |
//! |------|-----------------|-----------------|
//! | Right X | Right | Left |
//! | Right Y | Backward | Forward |
//! | Left X | Clockwise | CounterClockwise |
//! | Left Y | Down | Up |
//!
//! Left Y is inverted relative to its raw sign: pushing the stick up (negative)
//! climbs. Every axis sample issues the active direction with the scaled magnitude
//! and then the opposite direction with zero.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::axis::DirectionalPair;
use crate::controller::event::{Axis, Button, InputEvent, InputKind};
use crate::drone::{Actuator, Direction, DroneCommand, FlightData, FlipDirection};
use crate::events::Dispatcher;

/// What a button press does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Command(DroneCommand),
    /// Read-only: logs the latest battery percentage
    ReportBattery,
}

/// Button bindings.
pub const BUTTON_BINDINGS: &[(Button, ButtonAction)] = &[
    (Button::Triangle, ButtonAction::Command(DroneCommand::TakeOff)),
    (Button::Cross, ButtonAction::Command(DroneCommand::Land)),
    (Button::Circle, ButtonAction::ReportBattery),
    (Button::L1, ButtonAction::Command(DroneCommand::Flip(FlipDirection::Front))),
    (Button::L2, ButtonAction::Command(DroneCommand::Flip(FlipDirection::Back))),
    (Button::R1, ButtonAction::Command(DroneCommand::Flip(FlipDirection::Right))),
    (Button::R2, ButtonAction::Command(DroneCommand::Flip(FlipDirection::Left))),
];

/// Axis bindings as `(positive, negative)` pairs.
pub const AXIS_BINDINGS: &[(Axis, DirectionalPair)] = &[
    (Axis::RightX, DirectionalPair::new(Direction::Right, Direction::Left)),
    (Axis::RightY, DirectionalPair::new(Direction::Backward, Direction::Forward)),
    (Axis::LeftX, DirectionalPair::new(Direction::Clockwise, Direction::CounterClockwise)),
    (Axis::LeftY, DirectionalPair::new(Direction::Down, Direction::Up)),
];

#[must_use]
pub fn button_action(button: Button) -> Option<ButtonAction> {
    BUTTON_BINDINGS
        .iter()
        .find(|(bound, _)| *bound == button)
        .map(|(_, action)| *action)
}

#[must_use]
pub fn axis_pair(axis: Axis) -> Option<DirectionalPair> {
    AXIS_BINDINGS
        .iter()
        .find(|(bound, _)| *bound == axis)
        .map(|(_, pair)| *pair)
}

/// Translates gamepad events into actuator calls.
#[derive(Clone)]
pub struct CommandRouter {
    actuator: Arc<dyn Actuator>,
    flight_data: watch::Receiver<Option<FlightData>>,
}

impl CommandRouter {
    /// `flight_data` is only ever read here; the drone event handler owns the sender.
    pub fn new(actuator: Arc<dyn Actuator>, flight_data: watch::Receiver<Option<FlightData>>) -> Self {
        Self { actuator, flight_data }
    }

    /// Handles one gamepad event to completion.
    pub fn handle(&self, event: &InputEvent) {
        match *event {
            InputEvent::Button(button) => self.on_button(button),
            InputEvent::Axis { axis, value } => self.on_axis(axis, value),
        }
    }

    fn on_button(&self, button: Button) {
        match button_action(button) {
            Some(ButtonAction::Command(command)) => {
                match command {
                    DroneCommand::TakeOff => info!("Takeoff"),
                    DroneCommand::Land => info!("Land"),
                    other => info!("{}", other),
                }
                self.actuator.issue(command);
            }
            Some(ButtonAction::ReportBattery) => self.report_battery(),
            None => debug!("Unbound button {:?}", button),
        }
    }

    fn on_axis(&self, axis: Axis, value: i16) {
        let Some(pair) = axis_pair(axis) else {
            debug!("Unbound axis {:?}", axis);
            return;
        };
        for command in pair.resolve(value) {
            self.actuator.issue(command);
        }
    }

    fn report_battery(&self) {
        match *self.flight_data.borrow() {
            Some(data) => info!("battery: {}", data.battery_percentage),
            None => warn!("battery: no flight data received yet"),
        }
    }

    /// Registers one handler per bound button and axis on the gamepad dispatcher.
    pub fn bind(&self, dispatcher: &mut Dispatcher<InputEvent>) {
        for (button, _) in BUTTON_BINDINGS {
            let router = self.clone();
            dispatcher.on(InputKind::Button(*button), move |event| router.handle(event));
        }
        for (axis, _) in AXIS_BINDINGS {
            let router = self.clone();
            dispatcher.on(InputKind::Axis(*axis), move |event| router.handle(event));
        }
    }
}
