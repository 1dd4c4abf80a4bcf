//! Device registry: group name to ordered device list.

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;

use super::{parse_yaml, read_yaml};
use crate::error::{ConfigError, RegistryError};
use crate::platform::Vendor;

fn default_port() -> u16 {
    22
}

/// One managed device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceDescriptor {
    /// Device name, unique within its group.
    #[serde(rename = "device_name", alias = "name")]
    pub name: String,

    /// Group this device belongs to (filled in from the registry key).
    #[serde(skip)]
    pub group: String,

    /// Hostname or IP address.
    #[serde(rename = "ip", alias = "host", alias = "address")]
    pub address: String,

    /// SSH port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Vendor command table selector.
    #[serde(default, rename = "device_type")]
    pub vendor: Vendor,

    /// Username overriding the default credentials.
    #[serde(default)]
    pub username: Option<String>,

    /// Password overriding the default credentials.
    #[serde(default)]
    pub password: Option<SecretString>,

    /// Enable secret; its presence requests privilege escalation.
    #[serde(default)]
    pub secret: Option<SecretString>,
}

impl DeviceDescriptor {
    /// Create a descriptor with default port and vendor.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: String::new(),
            address: address.into(),
            port: default_port(),
            vendor: Vendor::default(),
            username: None,
            password: None,
            secret: None,
        }
    }

    /// Set the SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the vendor.
    pub fn with_vendor(mut self, vendor: Vendor) -> Self {
        self.vendor = vendor;
        self
    }

    /// Override the default credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Request privilege escalation with this secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Whether the device must be raised to privileged mode after login.
    pub fn wants_privilege(&self) -> bool {
        self.secret.is_some()
    }

    /// `host:port` for logging.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Read-only registry of device groups, in file order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    groups: IndexMap<String, Vec<DeviceDescriptor>>,
}

impl Registry {
    /// Load the registry from a YAML file keyed by group name.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let groups = read_yaml(path)?.ok_or_else(|| ConfigError::Empty {
            path: path.to_path_buf(),
        })?;
        Self::from_groups(groups)
    }

    /// Parse the registry from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let path = Path::new("<inline>");
        let groups = parse_yaml(yaml, path)?.ok_or_else(|| ConfigError::Empty {
            path: path.to_path_buf(),
        })?;
        Self::from_groups(groups)
    }

    /// Build a registry, stamping each device with its group and checking
    /// that names are unique within a group.
    pub fn from_groups(
        groups: IndexMap<String, Vec<DeviceDescriptor>>,
    ) -> Result<Self, ConfigError> {
        let mut checked = IndexMap::with_capacity(groups.len());

        for (group, mut devices) in groups {
            let mut seen = HashSet::new();
            for device in &mut devices {
                if device.name.trim().is_empty() {
                    return Err(ConfigError::Invalid {
                        message: format!("device in group '{group}' has an empty name"),
                    });
                }
                if device.address.trim().is_empty() {
                    return Err(ConfigError::Invalid {
                        message: format!("device '{}' in group '{group}' has no address", device.name),
                    });
                }
                if !seen.insert(device.name.clone()) {
                    return Err(ConfigError::Invalid {
                        message: format!("duplicate device '{}' in group '{group}'", device.name),
                    });
                }
                device.group = group.clone();
            }
            checked.insert(group, devices);
        }

        Ok(Self { groups: checked })
    }

    /// Resolve a group to its devices.
    pub fn resolve(&self, group: &str) -> Result<&[DeviceDescriptor], RegistryError> {
        self.groups
            .get(group)
            .map(Vec::as_slice)
            .ok_or_else(|| RegistryError::UnknownGroup {
                group: group.to_string(),
                known: self.group_names().map(str::to_string).collect(),
            })
    }

    /// Group names in file order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the registry has no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
