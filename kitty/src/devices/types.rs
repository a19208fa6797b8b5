use kitty_driver::DeviceKind;
use serde::{Deserialize, Serialize};


/// What a registered name refers to
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum DeviceType {
    /// A positional servo
    Servo,
    /// A dimmable LED
    Led,
    /// A named set of other devices, which may themselves be groups
    Group(Vec<String>),
}

impl DeviceType {
    /// The driver-facing kind of a leaf device, `None` for a group
    pub fn leaf_kind(&self) -> Option<DeviceKind> {
        match self {
            DeviceType::Servo => Some(DeviceKind::Servo),
            DeviceType::Led => Some(DeviceKind::Led),
            DeviceType::Group(_) => None,
        }
    }
}

impl From<DeviceKind> for DeviceType {
    fn from(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Servo => DeviceType::Servo,
            DeviceKind::Led => DeviceType::Led,
        }
    }
}


/// A device registered by the host
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Device {
    /// The name scripts use for the device
    pub name: String,
    /// What the device is
    pub device_type: DeviceType,
}

impl Device {
    /// Check if this is a group
    pub fn is_group(&self) -> bool {
        matches!(self.device_type, DeviceType::Group(_))
    }

    /// The direct members of a group, empty for a leaf device
    pub fn members(&self) -> &[String] {
        match &self.device_type {
            DeviceType::Group(members) => members,
            _ => &[],
        }
    }
}
