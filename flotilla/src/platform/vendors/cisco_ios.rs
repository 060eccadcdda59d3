//! Cisco IOS platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! router>                # user EXEC
//! router#                # privileged EXEC
//! router(config)#        # configuration mode
//! ```

use crate::platform::PlatformDefinition;

/// Create the Cisco IOS platform definition.
pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new("cisco_ios", r"(?m)^[\w.\-@()/:]{1,63}[>#]\s*$")
        .with_rejection("Invalid input detected")
        .with_rejection("Incomplete command")
        .with_rejection("Ambiguous command")
        .with_config_mode("configure terminal", "end")
        .with_save_command("write")
        .with_on_open_command("terminal length 0")
        // IOS prints console chatter before the config body; the marker
        // line is the first line that belongs to the capture.
        .with_preamble_marker("Current configuration :")
        // Rewritten by the device daily; would make every diff dirty.
        .with_volatile_pattern("ntp clock-period")
        .with_command("current_config", "show running-config")
        .with_command("version", "show version")
        .with_command("ip_interfaces", "show ip interface brief")
        .with_command("mac_table", "show mac address-table address {}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::bytes::Regex;

    #[test]
    fn test_prompt_pattern() {
        let platform = platform();
        let prompt = Regex::new(&platform.prompt_pattern).unwrap();

        assert!(prompt.is_match(b"router>"));
        assert!(prompt.is_match(b"router# "));
        assert!(prompt.is_match(b"edge-r1.lab#"));
        assert!(prompt.is_match(b"router(config)#"));
        assert!(prompt.is_match(b"show version output\nrouter#"));

        assert!(!prompt.is_match(b"router% "));
        assert!(!prompt.is_match(b"plain output"));
    }

    #[test]
    fn test_rejection_markers() {
        let platform = platform();
        assert!(
            platform
                .rejection_patterns
                .contains(&"Invalid input detected".to_string())
        );
        assert!(
            platform
                .rejection_patterns
                .contains(&"Ambiguous command".to_string())
        );
    }

    #[test]
    fn test_config_and_save_commands() {
        let platform = platform();
        assert_eq!(platform.config_enter, "configure terminal");
        assert_eq!(platform.config_exit, "end");
        assert_eq!(platform.save_command, "write");
        assert_eq!(platform.on_open_commands, vec!["terminal length 0"]);
    }

    #[test]
    fn test_dialect_table() {
        let platform = platform();
        assert_eq!(platform.dialect("current_config"), Some("show running-config"));
        assert_eq!(
            platform
                .render_dialect("mac_table", Some("aabb.ccdd.eeff"))
                .unwrap(),
            "show mac address-table address aabb.ccdd.eeff"
        );
    }
}
