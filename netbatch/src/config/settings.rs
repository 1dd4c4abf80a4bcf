//! Process-wide settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use secrecy::SecretString;
use serde::Deserialize;

use super::{parse_yaml, read_yaml};
use crate::config::DeviceDescriptor;
use crate::error::ConfigError;
use crate::operation::inspect::{CheckItem, Thresholds};

/// Login credentials for a device.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Username for authentication.
    pub username: String,

    /// Password for authentication.
    pub password: Option<SecretString>,
}

impl Credentials {
    /// Create credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(SecretString::from(password.into())),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: None,
        }
    }
}

/// Inspection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InspectSettings {
    /// Checks executed for every device.
    pub check_items: Vec<CheckItem>,

    /// Per-metric warning thresholds.
    pub warn_threshold: Thresholds,

    /// Scheduled inspection interval in seconds.
    pub interval: u64,
}

impl Default for InspectSettings {
    fn default() -> Self {
        Self {
            check_items: CheckItem::ALL.to_vec(),
            warn_threshold: Thresholds::default(),
            interval: 3600,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Directory receiving `netbatch.log`.
    pub path: PathBuf,

    /// Default level filter (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,

    /// Daily log files kept before the oldest is deleted.
    pub retention: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs"),
            level: "info".to_string(),
            retention: 7,
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Directory receiving JSON reports.
    pub path: PathBuf,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("reports"),
        }
    }
}

/// Template lookup settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// Directory holding configuration templates.
    pub path: PathBuf,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("templates"),
        }
    }
}

/// Process-wide settings, loaded once and read-only afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default credentials for devices without an override.
    pub credentials: Credentials,

    /// Per-attempt connection timeout in seconds.
    pub timeout: u64,

    /// Connection attempts per device.
    pub retry: u32,

    /// Devices processed at the same time within one batch.
    pub concurrency: usize,

    /// Inspection settings.
    pub inspect: InspectSettings,

    /// Log settings.
    pub log: LogSettings,

    /// Report settings.
    pub report: ReportSettings,

    /// Template settings.
    pub templates: TemplateSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            timeout: 10,
            retry: 3,
            concurrency: 1,
            inspect: InspectSettings::default(),
            log: LogSettings::default(),
            report: ReportSettings::default(),
            templates: TemplateSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file.
    ///
    /// A missing or empty file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        Ok(Self::try_load(path)?.unwrap_or_else(|| {
            warn!("Settings file {} not found, using defaults", path.display());
            Self::default()
        }))
    }

    /// Load settings from a YAML file, or `None` if there is no such file.
    ///
    /// Lets callers report the fallback themselves, e.g. once logging is up.
    pub fn try_load(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(read_yaml(path)?.unwrap_or_default()))
    }

    /// Parse settings from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(parse_yaml(yaml, Path::new("<inline>"))?.unwrap_or_default())
    }

    /// Per-attempt connection timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }

    /// Credentials for a device: its own override, else the defaults.
    pub fn credentials_for(&self, device: &DeviceDescriptor) -> Credentials {
        Credentials {
            username: device
                .username
                .clone()
                .unwrap_or_else(|| self.credentials.username.clone()),
            password: device
                .password
                .clone()
                .or_else(|| self.credentials.password.clone()),
        }
    }
}
