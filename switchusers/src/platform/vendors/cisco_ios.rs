//! Cisco IOS platform definition.
//!
//! Supports Cisco IOS and IOS-XE switches with the following privilege levels:
//! - `exec` - User EXEC mode with `>` prompt
//! - `privilege_exec` - Privileged EXEC mode with `#` prompt
//! - `configuration` - Configuration mode with `(config*)#` prompt
//!
//! # Prompt Examples
//!
//! ```text
//! access-sw1>                        # exec mode
//! access-sw1#                        # privilege_exec mode
//! access-sw1(config)#                # configuration mode
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Platform name for Cisco IOS.
pub const PLATFORM_NAME: &str = "cisco_ios";

/// Create the Cisco IOS platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", r"(?mi)^[\w.\-@/:]{1,63}>\s?\z").unwrap();

    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?mi)^[\w.\-@/:]{1,63}#\s?\z")
        .unwrap()
        .with_parent("exec")
        .with_escalate("enable")
        .with_auth(r"(?mi)^(?:enable\s)?password:\s?\z")
        .unwrap()
        .with_not_contains("(conf");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^[\w.\-@/:]{1,63}\(conf[\w.\-@/:+]{0,32}\)#\s?\z",
    )
    .unwrap()
    .with_parent("privilege_exec")
    .with_escalate("configure terminal");

    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% Unknown command")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 512")
        .with_terminal_size(512, 24)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cisco_platform() {
        let platform = platform();
        assert_eq!(platform.name, "cisco_ios");
        assert_eq!(platform.privilege_levels.len(), 3);
        assert_eq!(platform.default_privilege, "privilege_exec");
    }

    #[test]
    fn test_prompt_levels() {
        let platform = platform();
        assert_eq!(platform.privilege_for_prompt("access-sw1>").unwrap().name, "exec");
        assert_eq!(
            platform.privilege_for_prompt("access-sw1#").unwrap().name,
            "privilege_exec"
        );
        assert_eq!(
            platform.privilege_for_prompt("access-sw1(config)#").unwrap().name,
            "configuration"
        );
    }

    #[test]
    fn test_prompt_must_end_output() {
        let pattern = platform().prompt_pattern();
        assert!(pattern.is_match(b"show run | include username\nusername ops privilege 15\naccess-sw1#"));
        assert!(!pattern.is_match(b"access-sw1#show run\nbuilding configuration"));
    }

    #[test]
    fn test_enable_needs_secret() {
        let platform = platform();
        let path = platform.escalation_path("exec", "privilege_exec").unwrap();
        assert_eq!(path[0].escalate_command.as_deref(), Some("enable"));
        assert!(path[0].needs_auth());
        assert!(path[0].escalate_prompt.as_ref().unwrap().is_match(b"Password: "));
    }
}
