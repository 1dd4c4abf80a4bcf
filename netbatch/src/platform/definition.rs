//! Platform definition: the per-vendor command table.

use regex::bytes::Regex;

/// Position of a whitespace-separated field within a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Zero-based index counted from the first field.
    Start(usize),
    /// Zero-based index counted back from the last field.
    End(usize),
}

impl Column {
    /// Pick this column out of an already-split line.
    pub fn pick<'a>(&self, fields: &[&'a str]) -> Option<&'a str> {
        match *self {
            Column::Start(i) => fields.get(i).copied(),
            Column::End(i) => fields.len().checked_sub(i + 1).and_then(|i| fields.get(i).copied()),
        }
    }
}

/// Column layout of a vendor's interface summary output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceLayout {
    /// Interface name column.
    pub name: Column,

    /// Physical (link) state column.
    pub physical: Column,

    /// Protocol (line protocol) state column.
    pub protocol: Column,
}

/// Everything vendor-specific the engine needs to drive a device.
///
/// One static definition exists per [`Vendor`](super::Vendor); the engine
/// looks it up once per device and never branches on vendor names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "huawei_vrp", "cisco_ios").
    pub name: &'static str,

    /// Regex matching any CLI prompt of this platform at the end of output.
    pub prompt_pattern: &'static str,

    /// Regex matching a `[Y/N]` style confirmation question, if the platform asks one.
    pub confirm_pattern: Option<&'static str>,

    /// Answer sent when `confirm_pattern` matches.
    pub confirm_answer: &'static str,

    /// Commands run right after login (paging off, terminal width).
    pub on_open_commands: &'static [&'static str],

    /// Command that raises the session to privileged mode.
    pub enable_command: &'static str,

    /// Regex matching the password prompt shown by `enable_command`.
    pub enable_password_prompt: &'static str,

    /// Command entering configuration mode.
    pub config_enter: &'static str,

    /// Command leaving configuration mode back to the exec prompt.
    pub config_exit: &'static str,

    /// Command persisting the running configuration.
    pub persist_command: &'static str,

    /// Interface summary command.
    pub interface_command: &'static str,

    /// Leading word of the interface summary column-title line.
    pub interface_header: &'static str,

    /// Column layout of the interface summary.
    pub interface_layout: InterfaceLayout,

    /// CPU usage command.
    pub cpu_command: &'static str,

    /// Substrings identifying the CPU usage line.
    pub cpu_markers: &'static [&'static str],

    /// Memory usage command.
    pub memory_command: &'static str,

    /// Substrings identifying the memory usage line.
    pub memory_markers: &'static [&'static str],

    /// VLAN summary command.
    pub vlan_command: &'static str,

    /// Output substrings that mean the device rejected a command.
    pub failed_when_contains: &'static [&'static str],
}

/// A definition's regexes, compiled.
#[derive(Debug, Clone)]
pub struct PromptPatterns {
    /// Any CLI prompt.
    pub prompt: Regex,

    /// Confirmation question, if the platform asks one.
    pub confirm: Option<Regex>,

    /// Password prompt after the enable command.
    pub enable_password: Regex,
}

impl PlatformDefinition {
    /// Compile the prompt, confirmation and enable-password patterns.
    pub fn compile_patterns(&self) -> Result<PromptPatterns, regex::Error> {
        Ok(PromptPatterns {
            prompt: Regex::new(self.prompt_pattern)?,
            confirm: self.confirm_pattern.map(Regex::new).transpose()?,
            enable_password: Regex::new(self.enable_password_prompt)?,
        })
    }
}
