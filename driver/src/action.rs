use std::fmt::{Display, Formatter, Result};
use std::time::Duration;

use serde::{Deserialize, Serialize};


/// The kind of physical device an action is addressed to.
///
/// Groups never reach a driver: the interpreter expands them into their leaf devices first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// A positional servo, measured in degrees
    Servo,
    /// A dimmable LED, measured in percent brightness
    Led,
}

/// How the amount of an action should be applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Move relative to the current state
    RelativeMove,
    /// Set the state to an absolute value
    AbsoluteSet,
}

/// A single requested state change for one leaf device.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DeviceAction {
    /// The name of the leaf device
    pub device: String,
    /// What kind of device this is
    pub device_kind: DeviceKind,
    /// Relative or absolute
    pub kind: ActionKind,
    /// The amount to move by or the value to set to
    pub amount: f64,
    /// How long the action should last. Zero means apply immediately.
    pub duration: Duration,
}

impl DeviceAction {
    /// Build a relative move action
    pub fn relative_move(device: &str, device_kind: DeviceKind, amount: f64, duration: Duration) -> DeviceAction {
        DeviceAction { device: device.to_string(), device_kind, kind: ActionKind::RelativeMove, amount, duration }
    }

    /// Build an absolute set action
    pub fn absolute_set(device: &str, device_kind: DeviceKind, value: f64, duration: Duration) -> DeviceAction {
        DeviceAction { device: device.to_string(), device_kind, kind: ActionKind::AbsoluteSet, amount: value, duration }
    }

    /// Whether the action lasts for some period of time
    pub fn is_timed(&self) -> bool {
        !self.duration.is_zero()
    }
}

impl Display for DeviceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            DeviceKind::Servo => write!(f, "servo"),
            DeviceKind::Led => write!(f, "led"),
        }
    }
}

impl Display for DeviceAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let verb = match self.kind {
            ActionKind::RelativeMove => "move_by",
            ActionKind::AbsoluteSet => "set_to",
        };
        write!(f, "{} {} ({}) {}", verb, self.device, self.device_kind, self.amount)?;
        if self.is_timed() {
            write!(f, " for {}s", self.duration.as_secs_f64())?;
        }
        Ok(())
    }
}
