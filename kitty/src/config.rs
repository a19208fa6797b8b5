use std::fs;
use std::path::Path;

use kitty_driver::{DeviceKind, SimulatorSettings};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::InterpreterOptions;
use crate::devices::DeviceTable;
use crate::error::ConfigError;


/// A leaf device declared in the configuration file
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DeviceEntry {
    /// Name scripts use for the device
    pub name: String,
    /// `servo` or `led`
    #[serde(rename = "type")]
    pub kind: DeviceKind,
}

/// A group declared in the configuration file
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GroupEntry {
    /// Name scripts use for the group
    pub name: String,
    /// Devices or earlier groups in the group
    pub members: Vec<String>,
}


/// Everything a host needs to run scripts, loaded from TOML.
///
/// ```toml
/// [interpreter]
/// max_steps = 10000
///
/// [driver]
/// failure_rate = 0.0
///
/// [[devices]]
/// name = "s1"
/// type = "servo"
///
/// [[groups]]
/// name = "arms"
/// members = ["s1"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    /// Interpreter settings
    pub interpreter: InterpreterOptions,
    /// Simulated driver settings
    pub driver: SimulatorSettings,
    /// Leaf devices, registered first
    pub devices: Vec<DeviceEntry>,
    /// Groups, registered in file order after every device
    pub groups: Vec<GroupEntry>,
}

impl HostConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<HostConfig, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Toml(err.to_string()))
    }

    /// Read and parse a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<HostConfig, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(format!("{}: {}", path.display(), err)))?;
        let config = HostConfig::from_toml_str(&text)?;
        info!(path = %path.display(), devices = config.devices.len(), groups = config.groups.len(), "loaded host config");
        Ok(config)
    }

    /// Register every configured device and group in a new table
    pub fn build_device_table(&self) -> Result<DeviceTable, ConfigError> {
        let mut table = DeviceTable::new();
        for device in &self.devices {
            table.register_device(&device.name, device.kind.into())?;
        }
        for group in &self.groups {
            table.register_group(&group.name, group.members.as_slice())?;
        }
        Ok(table)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::DeviceType;

    const CONFIG: &str = r#"
[interpreter]
max_steps = 500

[driver]
realtime = false
failure_rate = 0.25
seed = 42

[[devices]]
name = "s1"
type = "servo"

[[devices]]
name = "l1"
type = "led"

[[groups]]
name = "everything"
members = ["s1", "l1"]
"#;

    #[test]
    fn test_from_toml_str() {
        let config = HostConfig::from_toml_str(CONFIG).unwrap();
        assert_eq!(config.interpreter.max_steps, Some(500));
        assert_eq!(config.driver.failure_rate, 0.25);
        assert_eq!(config.driver.seed, Some(42));
        assert_eq!(config.devices.len(), 2);
        assert_eq!(config.devices[1].kind, DeviceKind::Led);
        assert_eq!(config.groups[0].members, vec!["s1".to_string(), "l1".to_string()]);
    }

    #[test]
    fn test_defaults() {
        let config = HostConfig::from_toml_str("").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.interpreter.max_steps, None);
        assert!(!config.driver.realtime);
    }

    #[test]
    fn test_build_device_table() {
        let table = HostConfig::from_toml_str(CONFIG).unwrap().build_device_table().unwrap();
        assert_eq!(table.names(), ["s1".to_string(), "l1".to_string(), "everything".to_string()]);
        assert_eq!(table.get("l1").map(|device| device.device_type.clone()), Some(DeviceType::Led));
        assert_eq!(table.resolve("everything").unwrap().len(), 2);
    }

    #[test]
    fn test_errors() {
        let err = HostConfig::from_toml_str("[[devices]]\nname = \"s1\"\ntype = \"motor\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
        let config = HostConfig::from_toml_str("[[groups]]\nname = \"g\"\nmembers = [\"ghost\"]\n").unwrap();
        assert_eq!(
            config.build_device_table().unwrap_err(),
            ConfigError::UnknownMember { group: "g".to_string(), member: "ghost".to_string() }
        );
        let err = HostConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
