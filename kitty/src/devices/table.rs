use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::analysis::tokens::is_keyword;
use crate::devices::types::{Device, DeviceType};
use crate::error::{ConfigError, RuntimeError};


fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() | (c == '_') => {},
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() | (c == '_')) && !is_keyword(name)
}


/// Devices registered by the host, looked up by name.
///
/// A vector of names is kept next to the map so that iteration and group expansion
/// follow registration order. The table never contains a cyclic group: every
/// registration is checked before it is applied, and a rejected registration leaves
/// the table as it was.
#[derive(Clone, Debug, Default)]
pub struct DeviceTable {
    devices: HashMap<String, Device>,
    names: Vec<String>,
}

impl DeviceTable {
    /// Create a new empty table
    pub fn new() -> DeviceTable {
        DeviceTable::default()
    }

    /// Register a servo, an LED or a group.
    ///
    /// Leaf devices cannot be registered twice.
    pub fn register_device(&mut self, name: &str, device_type: DeviceType) -> Result<(), ConfigError> {
        if let DeviceType::Group(members) = device_type {
            return self.register_group(name, members.as_slice());
        }
        if !is_valid_name(name) {
            return Err(ConfigError::InvalidName(name.to_string()));
        }
        if self.devices.contains_key(name) {
            return Err(ConfigError::DuplicateDevice(name.to_string()));
        }
        info!(device = name, ?device_type, "registered device");
        self.insert(Device { name: name.to_string(), device_type });
        Ok(())
    }

    /// Register a group of existing devices.
    ///
    /// Registering a group name again replaces its membership.
    pub fn register_group<S: AsRef<str>>(&mut self, name: &str, members: &[S]) -> Result<(), ConfigError> {
        if !is_valid_name(name) {
            return Err(ConfigError::InvalidName(name.to_string()));
        }
        if let Some(existing) = self.devices.get(name) {
            if !existing.is_group() {
                return Err(ConfigError::DuplicateDevice(name.to_string()));
            }
        }
        if members.is_empty() {
            return Err(ConfigError::EmptyGroup(name.to_string()));
        }
        let members: Vec<String> = members.iter().map(|member| member.as_ref().to_string()).collect();
        for member in &members {
            if member == name {
                return Err(ConfigError::CyclicGroup {
                    group: name.to_string(),
                    path: vec![name.to_string(), name.to_string()],
                });
            }
            if !self.devices.contains_key(member) {
                return Err(ConfigError::UnknownMember { group: name.to_string(), member: member.clone() });
            }
        }
        for member in &members {
            if let Some(path) = self.path_between(member, name) {
                let mut cycle = vec![name.to_string()];
                cycle.extend(path);
                return Err(ConfigError::CyclicGroup { group: name.to_string(), path: cycle });
            }
        }
        info!(group = name, members = members.len(), "registered group");
        self.insert(Device { name: name.to_string(), device_type: DeviceType::Group(members) });
        Ok(())
    }

    /// Look up a device by name
    pub fn get(&self, name: &str) -> Option<&Device> {
        self.devices.get(name)
    }

    /// Check if a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.devices.contains_key(name)
    }

    /// Number of registered names, groups included
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Registered names in registration order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Expand a name into the leaf devices it stands for.
    ///
    /// Groups are walked depth first in member order and every leaf appears once, even
    /// when it can be reached through several nested groups.
    pub fn resolve(&self, name: &str) -> Result<Vec<&Device>, RuntimeError> {
        let root = self.get(name).ok_or_else(|| RuntimeError::UnknownDevice(name.to_string()))?;
        let mut leaves = vec![];
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack = vec![root];
        while let Some(device) = stack.pop() {
            if !visited.insert(device.name.as_str()) {
                continue;
            }
            match &device.device_type {
                DeviceType::Group(members) => {
                    for member in members.iter().rev() {
                        let member = self.get(member).ok_or_else(|| RuntimeError::UnknownDevice(member.clone()))?;
                        stack.push(member);
                    }
                },
                _ => leaves.push(device),
            }
        }
        Ok(leaves)
    }

    fn insert(&mut self, device: Device) {
        if !self.devices.contains_key(&device.name) {
            self.names.push(device.name.clone());
        }
        self.devices.insert(device.name.clone(), device);
    }

    /// Find a chain of group memberships leading from `start` to `target`
    fn path_between(&self, start: &str, target: &str) -> Option<Vec<String>> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack = vec![vec![start.to_string()]];
        while let Some(path) = stack.pop() {
            let current = path.last()?.clone();
            if current == target {
                return Some(path);
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(device) = self.devices.get(&current) {
                for member in device.members().iter().rev() {
                    let mut next = path.clone();
                    next.push(member.clone());
                    stack.push(next);
                }
            }
        }
        None
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn names(devices: Vec<&Device>) -> Vec<&str> {
        devices.iter().map(|device| device.name.as_str()).collect()
    }

    fn table() -> DeviceTable {
        let mut table = DeviceTable::new();
        table.register_device("s1", DeviceType::Servo).unwrap();
        table.register_device("s2", DeviceType::Servo).unwrap();
        table.register_device("l1", DeviceType::Led).unwrap();
        table
    }

    #[test]
    fn test_new() {
        let table = DeviceTable::new();
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_register_device() {
        let mut table = table();
        assert_eq!(table.len(), 3);
        assert!(table.contains("l1"));
        assert_eq!(table.get("s2").map(|device| device.device_type.clone()), Some(DeviceType::Servo));
        assert_eq!(
            table.register_device("s1", DeviceType::Led),
            Err(ConfigError::DuplicateDevice("s1".to_string()))
        );
        assert_eq!(table.names(), ["s1".to_string(), "s2".to_string(), "l1".to_string()]);
    }

    #[test]
    fn test_invalid_names() {
        let mut table = DeviceTable::new();
        for name in ["", "1abc", "has space", "while", "true", "s-1"] {
            assert_eq!(
                table.register_device(name, DeviceType::Servo),
                Err(ConfigError::InvalidName(name.to_string()))
            );
        }
        assert!(table.register_device("_arm_2", DeviceType::Servo).is_ok());
    }

    #[test]
    fn test_register_group() {
        let mut table = table();
        table.register_group("arms", &["s1", "s2"]).unwrap();
        assert!(table.get("arms").unwrap().is_group());
        assert_eq!(
            table.register_group("s1", &["s2"]),
            Err(ConfigError::DuplicateDevice("s1".to_string()))
        );
        assert_eq!(
            table.register_group("empty", &[] as &[&str]),
            Err(ConfigError::EmptyGroup("empty".to_string()))
        );
        assert_eq!(
            table.register_group("g", &["s1", "s9"]),
            Err(ConfigError::UnknownMember { group: "g".to_string(), member: "s9".to_string() })
        );
        assert!(!table.contains("g"));
    }

    #[test]
    fn test_group_through_register_device() {
        let mut table = table();
        table.register_device("pair", DeviceType::Group(vec!["s1".to_string(), "l1".to_string()])).unwrap();
        assert_eq!(names(table.resolve("pair").unwrap()), vec!["s1", "l1"]);
    }

    #[test]
    fn test_replace_group() {
        let mut table = table();
        table.register_group("g", &["s1"]).unwrap();
        table.register_group("g", &["s2", "l1"]).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(names(table.resolve("g").unwrap()), vec!["s2", "l1"]);
    }

    #[test]
    fn test_cyclic_groups() {
        let mut table = table();
        table.register_group("inner", &["s1"]).unwrap();
        table.register_group("outer", &["inner", "s2"]).unwrap();
        table.register_group("self_ref", &["s1"]).unwrap();
        assert_eq!(
            table.register_group("self_ref", &["self_ref"]),
            Err(ConfigError::CyclicGroup {
                group: "self_ref".to_string(),
                path: vec!["self_ref".to_string(), "self_ref".to_string()],
            })
        );
        let err = table.register_group("inner", &["outer"]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::CyclicGroup {
                group: "inner".to_string(),
                path: vec!["inner".to_string(), "outer".to_string(), "inner".to_string()],
            }
        );
        // Unchanged after the rejected registration
        assert_eq!(names(table.resolve("inner").unwrap()), vec!["s1"]);
        assert_eq!(names(table.resolve("outer").unwrap()), vec!["s1", "s2"]);
    }

    #[test]
    fn test_resolve() {
        let mut table = table();
        assert_eq!(names(table.resolve("s1").unwrap()), vec!["s1"]);
        table.register_group("arms", &["s2", "s1"]).unwrap();
        table.register_group("all", &["l1", "arms", "s1"]).unwrap();
        assert_eq!(names(table.resolve("all").unwrap()), vec!["l1", "s2", "s1"]);
        assert_eq!(table.resolve("nothing"), Err(RuntimeError::UnknownDevice("nothing".to_string())));
    }
}
