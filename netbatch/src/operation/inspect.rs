//! Health inspection: interfaces, CPU, memory, VLANs.
//!
//! Every check runs independently. A failing command or unreadable output
//! becomes an inline error marker in that check's result; the inspection as a
//! whole always succeeds once a session exists.
//!
//! Parsing is line oriented and deliberately forgiving. Each parser is a plain
//! function over the command output so it can be tested without a device.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::{Operation, OperationKind, OperationResult};
use crate::config::{DeviceDescriptor, InspectSettings};
use crate::platform::PlatformDefinition;
use crate::session::Session;

/// Usage value reported when a metric could not be read.
pub const USAGE_UNAVAILABLE: i32 = -1;

/// One inspection check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckItem {
    InterfaceStatus,
    CpuUsage,
    MemoryUsage,
    VlanStatus,
}

impl CheckItem {
    /// Every check, in report order.
    pub const ALL: [CheckItem; 4] = [
        CheckItem::InterfaceStatus,
        CheckItem::CpuUsage,
        CheckItem::MemoryUsage,
        CheckItem::VlanStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckItem::InterfaceStatus => "interface_status",
            CheckItem::CpuUsage => "cpu_usage",
            CheckItem::MemoryUsage => "memory_usage",
            CheckItem::VlanStatus => "vlan_status",
        }
    }
}

/// Warning thresholds in percent; a reading at or above warns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cpu_usage: i32,
    pub memory_usage: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_usage: 80,
            memory_usage: 80,
        }
    }
}

/// Result of a check that may fail without failing the inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CheckOutcome<T> {
    Ok(T),
    Error { error: String },
}

impl<T> CheckOutcome<T> {
    fn failed(error: impl ToString) -> Self {
        CheckOutcome::Error {
            error: error.to_string(),
        }
    }
}

/// An interface whose link or protocol is not up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceState {
    pub interface: String,
    pub physical_status: String,
    pub protocol_status: String,
}

/// CPU or memory usage reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageReading {
    /// Percent used; 0 when not reported, [`USAGE_UNAVAILABLE`] on failure.
    pub usage: i32,
    pub is_warn: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UsageReading {
    fn new(usage: i32, threshold: i32) -> Self {
        Self {
            usage,
            is_warn: usage >= threshold,
            error: None,
        }
    }

    /// A reading that could not be taken. Always warns.
    fn unavailable(error: impl ToString) -> Self {
        Self {
            usage: USAGE_UNAVAILABLE,
            is_warn: true,
            error: Some(error.to_string()),
        }
    }
}

/// A configured VLAN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vlan {
    pub vlan_id: u16,
    pub vlan_name: String,
}

/// Payload of a successful inspection. Only requested checks are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InspectionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface_status: Option<CheckOutcome<Vec<InterfaceState>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_usage: Option<UsageReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<UsageReading>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_status: Option<CheckOutcome<Vec<Vlan>>>,
}

impl InspectionData {
    /// Conditions needing operator attention.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        match &self.interface_status {
            Some(CheckOutcome::Ok(abnormal)) if !abnormal.is_empty() => {
                let names: Vec<&str> = abnormal.iter().map(|i| i.interface.as_str()).collect();
                warnings.push(format!("abnormal interfaces: {}", names.join(", ")));
            }
            Some(CheckOutcome::Error { error }) => {
                warnings.push(format!("interface_status check failed: {error}"));
            }
            _ => {}
        }

        for (item, reading) in [
            (CheckItem::CpuUsage, &self.cpu_usage),
            (CheckItem::MemoryUsage, &self.memory_usage),
        ] {
            let Some(reading) = reading else { continue };
            match &reading.error {
                Some(error) => warnings.push(format!("{} check failed: {error}", item.as_str())),
                None if reading.is_warn => {
                    warnings.push(format!("{} at {}%", item.as_str(), reading.usage))
                }
                None => {}
            }
        }

        warnings
    }

    /// Whether any check flagged the device.
    pub fn needs_attention(&self) -> bool {
        !self.warnings().is_empty()
    }
}

/// Parse an interface summary into the interfaces that are not fully up.
///
/// Everything up to and including the column-title line is skipped; without
/// a title line only the first line is. Lines the layout cannot pick three
/// columns from are ignored.
pub fn parse_interfaces(output: &str, platform: &PlatformDefinition) -> Vec<InterfaceState> {
    let lines: Vec<&str> = output.lines().collect();
    let body_start = lines
        .iter()
        .position(|line| line.trim_start().starts_with(platform.interface_header))
        .map_or(1, |header| header + 1);

    let layout = platform.interface_layout;
    lines
        .iter()
        .skip(body_start)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 3 {
                return None;
            }
            Some((
                layout.name.pick(&fields)?,
                layout.physical.pick(&fields)?,
                layout.protocol.pick(&fields)?,
            ))
        })
        .filter(|(_, physical, protocol)| {
            !physical.eq_ignore_ascii_case("up") || !protocol.eq_ignore_ascii_case("up")
        })
        .map(|(name, physical, protocol)| InterfaceState {
            interface: name.to_string(),
            physical_status: physical.to_string(),
            protocol_status: protocol.to_string(),
        })
        .collect()
}

/// Read a usage percentage from the first line carrying a marker and a `%`.
///
/// No such line reads as 0. A matching line without a number before its
/// first `%` reads as unavailable.
pub fn parse_usage(output: &str, markers: &[&str], threshold: i32) -> UsageReading {
    let Some(line) = output
        .lines()
        .find(|line| line.contains('%') && markers.iter().any(|marker| line.contains(marker)))
    else {
        return UsageReading::new(0, threshold);
    };

    match leading_percent(line) {
        Some(usage) => UsageReading::new(usage, threshold),
        None => UsageReading::unavailable(format!("unparseable usage line: {}", line.trim())),
    }
}

/// Integer part of the number immediately before the first `%`.
fn leading_percent(line: &str) -> Option<i32> {
    let before = line.split('%').next()?.trim_end();
    let start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit() || *c == '.')
        .last()
        .map(|(i, _)| i)?;

    before[start..].split('.').next()?.parse().ok()
}

/// Parse a VLAN summary into `(id, name)` pairs.
pub fn parse_vlans(output: &str) -> Vec<Vlan> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.contains("---"))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let vlan_id = fields.next()?.parse().ok()?;
            let vlan_name = fields.next().unwrap_or("default").to_string();
            Some(Vlan { vlan_id, vlan_name })
        })
        .collect()
}

/// Run `check_items` against `session`.
pub async fn inspect<S: Session>(
    session: &mut S,
    device: &DeviceDescriptor,
    check_items: &[CheckItem],
    thresholds: &Thresholds,
) -> InspectionData {
    let platform = device.vendor.platform();
    let mut data = InspectionData::default();

    for item in check_items {
        debug!("{}: running check {}", device.name, item.as_str());
        match item {
            CheckItem::InterfaceStatus => {
                let outcome = match session.run(platform.interface_command).await {
                    Ok(output) => CheckOutcome::Ok(parse_interfaces(&output, platform)),
                    Err(e) => {
                        warn!("{}: interface check failed: {}", device.name, e);
                        CheckOutcome::failed(e)
                    }
                };
                data.interface_status = Some(outcome);
            }
            CheckItem::CpuUsage => {
                data.cpu_usage = Some(
                    read_usage(session, device, platform.cpu_command, platform.cpu_markers, thresholds.cpu_usage)
                        .await,
                );
            }
            CheckItem::MemoryUsage => {
                data.memory_usage = Some(
                    read_usage(
                        session,
                        device,
                        platform.memory_command,
                        platform.memory_markers,
                        thresholds.memory_usage,
                    )
                    .await,
                );
            }
            CheckItem::VlanStatus => {
                let outcome = match session.run(platform.vlan_command).await {
                    Ok(output) => CheckOutcome::Ok(parse_vlans(&output)),
                    Err(e) => {
                        warn!("{}: vlan check failed: {}", device.name, e);
                        CheckOutcome::failed(e)
                    }
                };
                data.vlan_status = Some(outcome);
            }
        }
    }

    data
}

async fn read_usage<S: Session>(
    session: &mut S,
    device: &DeviceDescriptor,
    command: &str,
    markers: &[&str],
    threshold: i32,
) -> UsageReading {
    match session.run(command).await {
        Ok(output) => {
            let reading = parse_usage(&output, markers, threshold);
            if let Some(error) = &reading.error {
                warn!("{}: '{}': {}", device.name, command, error);
            }
            reading
        }
        Err(e) => {
            warn!("{}: '{}' failed: {}", device.name, command, e);
            UsageReading::unavailable(e)
        }
    }
}

/// Inspection with fixed check items and thresholds.
#[derive(Debug, Clone)]
pub struct Inspect {
    check_items: Vec<CheckItem>,
    thresholds: Thresholds,
}

impl Inspect {
    pub fn new(check_items: Vec<CheckItem>, thresholds: Thresholds) -> Self {
        Self {
            check_items,
            thresholds,
        }
    }

    pub fn from_settings(settings: &InspectSettings) -> Self {
        Self::new(settings.check_items.clone(), settings.warn_threshold)
    }
}

impl Operation for Inspect {
    type Output = InspectionData;

    fn kind(&self) -> OperationKind {
        OperationKind::Inspect
    }

    async fn execute<S: Session>(
        &self,
        session: &mut S,
        device: &DeviceDescriptor,
    ) -> OperationResult<InspectionData> {
        OperationResult::Success(inspect(session, device, &self.check_items, &self.thresholds).await)
    }

    fn warnings(&self, output: &InspectionData) -> Vec<String> {
        output.warnings()
    }
}
