//! Huawei VRP platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! <HUAWEI>                          # user view
//! [HUAWEI]                          # system view
//! [~HUAWEI-GigabitEthernet0/0/1]    # interface view (VRP8 two-stage commit)
//! ```
//!
//! `system-view` enters configuration, `return` goes straight back to the
//! user view. `save` asks for confirmation before writing.

use crate::platform::{Column, InterfaceLayout, PlatformDefinition};

/// Huawei VRP platform definition.
pub static PLATFORM: PlatformDefinition = PlatformDefinition {
    name: "huawei_vrp",
    prompt_pattern: r"(?m)^[<\[][~*]?[\w.\-@/: ]{1,63}[>\]]\s*$",
    confirm_pattern: Some(r"(?i)\[Y/N\]:?\s*$"),
    confirm_answer: "y",
    on_open_commands: &["screen-length 0 temporary"],
    enable_command: "super",
    enable_password_prompt: r"(?mi)password:\s*$",
    config_enter: "system-view",
    config_exit: "return",
    persist_command: "save",
    interface_command: "display interface brief",
    interface_header: "Interface",
    interface_layout: InterfaceLayout {
        name: Column::Start(0),
        physical: Column::Start(1),
        protocol: Column::Start(2),
    },
    cpu_command: "display cpu-usage",
    cpu_markers: &["CPU Usage", "CPU utilization"],
    memory_command: "display memory-usage",
    memory_markers: &["Memory Using Percentage", "Memory Usage Ratio"],
    vlan_command: "display vlan brief",
    failed_when_contains: &[
        "Error: ",
        "Unrecognized command",
        "Incomplete command",
        "Too many parameters",
        "Wrong parameter",
    ],
};

#[cfg(test)]
mod tests {
    use regex::Regex;

    use super::*;

    #[test]
    fn test_prompt_match() {
        let prompt = Regex::new(PLATFORM.prompt_pattern).unwrap();
        assert!(prompt.is_match("<HUAWEI>"));
        assert!(prompt.is_match("output\n[HUAWEI]"));
        assert!(prompt.is_match("[~HUAWEI-GigabitEthernet0/0/1]"));
        assert!(prompt.is_match("[*CORE-SW-01] "));
        assert!(!prompt.is_match("GigabitEthernet0/0/1 up up"));
    }

    #[test]
    fn test_confirm_match() {
        let confirm = Regex::new(PLATFORM.confirm_pattern.unwrap()).unwrap();
        assert!(confirm.is_match("Are you sure to continue?[Y/N]:"));
        assert!(confirm.is_match("Continue? [y/n] "));
        assert!(!confirm.is_match("<HUAWEI>"));
    }

    #[test]
    fn test_config_commands() {
        assert_eq!(PLATFORM.config_enter, "system-view");
        assert_eq!(PLATFORM.config_exit, "return");
        assert_eq!(PLATFORM.persist_command, "save");
    }
}
