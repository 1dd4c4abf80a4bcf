//! YAML configuration: the device registry and process settings.
//!
//! Both are loaded once at startup and only read afterwards, so they can be
//! shared by reference across concurrently processed devices.

mod registry;
mod settings;

use std::path::Path;

use serde::de::DeserializeOwned;

pub use registry::{DeviceDescriptor, Registry};
pub use settings::{
    Credentials, InspectSettings, LogSettings, ReportSettings, Settings, TemplateSettings,
};

use crate::error::ConfigError;

/// Read and parse a YAML file. An empty file yields `None`.
fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_yaml(&text, path)
}

/// Parse YAML text. Blank text yields `None`.
fn parse_yaml<T: DeserializeOwned>(text: &str, path: &Path) -> Result<Option<T>, ConfigError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
