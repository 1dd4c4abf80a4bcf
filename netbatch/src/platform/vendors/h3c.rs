//! H3C / HPE Comware platform definition.
//!
//! Prompts follow the same `<device>` / `[device]` convention as Huawei VRP.
//! `save force` writes the startup configuration without asking.

use crate::platform::{Column, InterfaceLayout, PlatformDefinition};

/// Comware platform definition.
pub static PLATFORM: PlatformDefinition = PlatformDefinition {
    name: "h3c_comware",
    prompt_pattern: r"(?m)^[<\[][\w.\-@/: ]{1,63}[>\]]\s*$",
    confirm_pattern: Some(r"(?i)\[Y/N\]:?\s*$"),
    confirm_answer: "y",
    on_open_commands: &["screen-length disable"],
    enable_command: "super",
    enable_password_prompt: r"(?mi)password:\s*$",
    config_enter: "system-view",
    config_exit: "return",
    persist_command: "save force",
    interface_command: "display ip interface brief",
    interface_header: "Interface",
    interface_layout: InterfaceLayout {
        name: Column::Start(0),
        physical: Column::Start(1),
        protocol: Column::Start(2),
    },
    cpu_command: "display cpu-usage",
    cpu_markers: &["in last 5 seconds", "CPU Usage"],
    memory_command: "display memory",
    memory_markers: &["Used Rate", "Memory Using Percentage"],
    vlan_command: "display vlan brief",
    failed_when_contains: &["% Unrecognized command", "% Incomplete command", "% Wrong parameter"],
};

#[cfg(test)]
mod tests {
    use regex::Regex;

    use super::*;

    #[test]
    fn test_prompt_match() {
        let prompt = Regex::new(PLATFORM.prompt_pattern).unwrap();
        assert!(prompt.is_match("<H3C>"));
        assert!(prompt.is_match("[H3C-vlan10]"));
        assert!(!prompt.is_match("H3C#"));
    }

    #[test]
    fn test_persist_is_non_interactive() {
        assert_eq!(PLATFORM.persist_command, "save force");
    }
}
