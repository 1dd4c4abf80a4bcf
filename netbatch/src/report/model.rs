//! Per-device and per-batch report records.

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::error::RegistryError;
use crate::operation::OperationResult;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Success payload or failure reason, tagged by `status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeviceOutcome<T> {
    Success { data: T },
    Failure { reason: String },
}

/// Outcome of one device in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport<T> {
    /// Device name; the key of this report in [`BatchReport::devices`].
    #[serde(skip)]
    pub name: String,

    #[serde(flatten)]
    pub outcome: DeviceOutcome<T>,

    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Local>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl<T> DeviceReport<T> {
    pub fn success(name: impl Into<String>, data: T, warnings: Vec<String>) -> Self {
        Self {
            name: name.into(),
            outcome: DeviceOutcome::Success { data },
            timestamp: Local::now(),
            warnings,
        }
    }

    pub fn failure(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: DeviceOutcome::Failure {
                reason: reason.into(),
            },
            timestamp: Local::now(),
            warnings: Vec::new(),
        }
    }

    /// Build from an operation result, attaching `warnings` on success.
    pub fn from_result(
        name: impl Into<String>,
        result: OperationResult<T>,
        warnings: impl FnOnce(&T) -> Vec<String>,
    ) -> Self {
        match result {
            OperationResult::Success(data) => {
                let warnings = warnings(&data);
                Self::success(name, data, warnings)
            }
            OperationResult::Failure(reason) => Self::failure(name, reason),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, DeviceOutcome::Success { .. })
    }

    /// Failure reason, if the device failed.
    pub fn reason(&self) -> Option<&str> {
        match &self.outcome {
            DeviceOutcome::Failure { reason } => Some(reason),
            DeviceOutcome::Success { .. } => None,
        }
    }

    /// Success payload, if the device succeeded.
    pub fn data(&self) -> Option<&T> {
        match &self.outcome {
            DeviceOutcome::Success { data } => Some(data),
            DeviceOutcome::Failure { .. } => None,
        }
    }
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
}

/// Aggregate outcome of one operation over one device group.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<T> {
    pub group_name: String,
    pub total: usize,
    pub success: usize,

    /// Names of failed devices, in registry order.
    pub failed: Vec<String>,

    /// Device reports keyed by name, in registry order.
    pub devices: IndexMap<String, DeviceReport<T>>,

    /// Batch-level error; set only when the group could not be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> BatchReport<T> {
    /// Empty report for a group the registry does not know.
    pub fn unknown_group(group: impl Into<String>, error: &RegistryError) -> Self {
        Self {
            group_name: group.into(),
            total: 0,
            success: 0,
            failed: Vec::new(),
            devices: IndexMap::new(),
            error: Some(error.to_string()),
        }
    }

    /// Aggregate device reports, keeping their order.
    pub fn from_devices(group: impl Into<String>, reports: Vec<DeviceReport<T>>) -> Self {
        let failed = reports
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.name.clone())
            .collect();
        let devices: IndexMap<_, _> = reports.into_iter().map(|r| (r.name.clone(), r)).collect();

        Self {
            group_name: group.into(),
            total: devices.len(),
            success: devices.values().filter(|r| r.is_success()).count(),
            failed,
            devices,
            error: None,
        }
    }

    pub fn device(&self, name: &str) -> Option<&DeviceReport<T>> {
        self.devices.get(name)
    }

    /// Devices with warnings, in registry order.
    pub fn needing_attention(&self) -> impl Iterator<Item = &DeviceReport<T>> {
        self.devices.values().filter(|r| !r.warnings.is_empty())
    }
}
