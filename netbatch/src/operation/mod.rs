//! Per-device operations.
//!
//! An [`Operation`] runs against one ready [`Session`] and produces an
//! [`OperationResult`]. The batch orchestrator owns the session; operations
//! only borrow it.

pub mod config_push;
pub mod inspect;

use std::fmt;
use std::future::Future;

use serde::Serialize;

use crate::config::DeviceDescriptor;
use crate::session::Session;

pub use config_push::{ConfigOutput, ConfigPush};
pub use inspect::{CheckItem, Inspect, InspectionData, Thresholds};

/// Outcome of one operation on one device.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult<T> {
    /// Operation completed; payload is operation-specific.
    Success(T),

    /// Operation aborted with a human-readable reason.
    Failure(String),
}

impl<T> OperationResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Success(_))
    }
}

impl<T, E: fmt::Display> From<Result<T, E>> for OperationResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(output) => OperationResult::Success(output),
            Err(e) => OperationResult::Failure(e.to_string()),
        }
    }
}

/// Which operation a report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Config,
    Inspect,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Config => "config",
            OperationKind::Inspect => "inspect",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work executed against one ready session.
pub trait Operation: Send + Sync {
    /// Structured payload produced on success.
    type Output: Serialize + Send;

    /// Report kind for this operation.
    fn kind(&self) -> OperationKind;

    /// Run against `session`, which belongs to `device`.
    fn execute<S: Session>(
        &self,
        session: &mut S,
        device: &DeviceDescriptor,
    ) -> impl Future<Output = OperationResult<Self::Output>> + Send;

    /// Conditions in a successful payload that need operator attention.
    fn warnings(&self, _output: &Self::Output) -> Vec<String> {
        Vec::new()
    }
}
