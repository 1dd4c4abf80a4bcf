//! Cisco IOS / IOS-XE platform definition.
//!
//! Prompt patterns are adapted from [scrapli](https://github.com/carlmontanari/scrapli).
//!
//! # Prompt Examples
//!
//! ```text
//! router>                  # exec mode
//! router#                  # privileged exec
//! router(config)#          # configuration mode
//! router(config-if)#       # config sub-mode
//! ```
//!
//! `show ip interface brief` splits "administratively down" across two
//! fields, so the states are read from the end of the line.

use crate::platform::{Column, InterfaceLayout, PlatformDefinition};

/// Cisco IOS platform definition.
pub static PLATFORM: PlatformDefinition = PlatformDefinition {
    name: "cisco_ios",
    prompt_pattern: r"(?m)^[\w.\-@/:]{1,63}(?:\(config[\w.\-@/:+]{0,32}\))?[>#]\s*$",
    confirm_pattern: Some(r"(?i)\[confirm\]\s*$"),
    confirm_answer: "",
    on_open_commands: &["terminal length 0", "terminal width 511"],
    enable_command: "enable",
    enable_password_prompt: r"(?mi)^password:\s*$",
    config_enter: "configure terminal",
    config_exit: "end",
    persist_command: "do write memory",
    interface_command: "show ip interface brief",
    interface_header: "Interface",
    interface_layout: InterfaceLayout {
        name: Column::Start(0),
        physical: Column::End(1),
        protocol: Column::End(0),
    },
    cpu_command: "show processes cpu | include CPU utilization",
    cpu_markers: &["CPU utilization"],
    memory_command: "show platform software status control-processor brief | section Memory",
    memory_markers: &["Healthy", "Warning", "Critical"],
    vlan_command: "show vlan brief",
    failed_when_contains: &[
        "% Ambiguous command",
        "% Incomplete command",
        "% Invalid input detected",
        "% Unknown command",
    ],
};

#[cfg(test)]
mod tests {
    use regex::Regex;

    use super::*;

    #[test]
    fn test_prompt_match() {
        let prompt = Regex::new(PLATFORM.prompt_pattern).unwrap();
        assert!(prompt.is_match("router>"));
        assert!(prompt.is_match("router#"));
        assert!(prompt.is_match("router(config)#"));
        assert!(prompt.is_match("router(config-if)# "));
        assert!(!prompt.is_match("<HUAWEI>"));
    }

    #[test]
    fn test_interface_columns_from_end() {
        let line = "GigabitEthernet0/2 unassigned YES unset administratively down down";
        let fields: Vec<&str> = line.split_whitespace().collect();
        let layout = PLATFORM.interface_layout;
        assert_eq!(layout.name.pick(&fields), Some("GigabitEthernet0/2"));
        assert_eq!(layout.physical.pick(&fields), Some("down"));
        assert_eq!(layout.protocol.pick(&fields), Some("down"));
    }
}
