//! Error types for netbatch.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for netbatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Registry lookup errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Connection establishment errors
    #[error("Connect error: {0}")]
    Connect(#[from] ConnectError),

    /// Errors on a live session
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Report persistence errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Logger could not be installed
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Errors while loading the device registry or settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid YAML for the expected shape
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Config file parsed to nothing
    #[error("Config file {path} is empty")]
    Empty { path: PathBuf },

    /// Semantically invalid configuration
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    /// Device type string not present in the vendor table
    #[error("Unknown device type '{name}'")]
    UnknownVendor { name: String },
}

/// Device registry lookup errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Requested group does not exist
    #[error("device group '{group}' does not exist; known groups: [{}]", known.join(", "))]
    UnknownGroup { group: String, known: Vec<String> },
}

/// Errors returned by a session provider when opening a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// Credentials were rejected; retrying cannot help
    #[error("authentication failed for user '{user}'")]
    AuthFailed { user: String },

    /// The device did not answer in time
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    /// Any other transport failure
    #[error("{0}")]
    Other(String),
}

impl ConnectError {
    /// Whether another connection attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ConnectError::AuthFailed { .. })
    }
}

/// Errors on an already-open session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// SSH protocol or I/O failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Prompt not seen within the read timeout
    #[error("prompt not found within {0:?}")]
    Timeout(Duration),

    /// The remote side closed the channel
    #[error("channel closed")]
    Closed,

    /// The device reported an error for a command
    #[error("command '{command}' failed: {message}")]
    CommandFailed { command: String, message: String },

    /// Privilege escalation did not reach the expected mode
    #[error("privilege escalation failed: {0}")]
    Privilege(String),
}

/// Template rendering errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Template file does not exist (or the name is not a plain file name)
    #[error("template '{name}' not found")]
    Missing { name: String },

    /// Template references a placeholder with no supplied value
    #[error("template '{name}' requires parameter '{param}'")]
    ParamMissing { name: String, param: String },

    /// Template exists but could not be read
    #[error("failed to read template '{name}': {message}")]
    Io { name: String, message: String },
}

/// Errors that abort a single device's operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// Rendering the configuration template failed
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Rendered template had no commands left
    #[error("template '{template}' rendered no commands")]
    EmptyCommandSet { template: String },

    /// Sending commands failed
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Report persistence errors.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Report could not be written
    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Report could not be serialized
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias using netbatch's Error.
pub type Result<T> = std::result::Result<T, Error>;
