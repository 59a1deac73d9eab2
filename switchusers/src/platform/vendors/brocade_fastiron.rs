//! Brocade / Ruckus FastIron platform definition.
//!
//! FastIron prompts carry the login method and may contain spaces:
//!
//! ```text
//! SSH@ICX7450-48 Router>             # exec mode
//! SSH@ICX7450-48 Router#             # privilege_exec mode
//! SSH@ICX7450-48 Router(config)#     # configuration mode
//! ```
//!
//! `username <name> privilege 0 password` without a password asks for it
//! on a separate `Enter Password:` line on 07.2 firmware.

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Platform name for Brocade FastIron.
pub const PLATFORM_NAME: &str = "brocade_fastiron";

/// Create the Brocade FastIron platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", r"(?mi)^[\w.\-@/: ]{1,63}>\s?\z").unwrap();

    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?mi)^[\w.\-@/: ]{1,63}#\s?\z")
        .unwrap()
        .with_parent("exec")
        .with_escalate("enable")
        .with_auth(r"(?mi)password:\s?\z")
        .unwrap()
        .with_not_contains("(config");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^[\w.\-@/: ]{1,63}\(config[\w.\-@/:+]{0,32}\)#\s?\z",
    )
    .unwrap()
    .with_parent("privilege_exec")
    .with_escalate("configure terminal");

    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_failure_pattern("Invalid input")
        .with_failure_pattern("Incomplete command")
        .with_failure_pattern("Error -")
        .with_on_open_command("skip-page-display")
}
