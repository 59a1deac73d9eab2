//! HP ProCurve / ArubaOS-Switch platform definition.
//!
//! ProCurve greets SSH sessions with a "Press any key to continue" banner
//! before the first prompt, which counts as an input request here.
//!
//! ```text
//! HP-2920-48G>                       # operator
//! HP-2920-48G#                       # manager
//! HP-2920-48G(config)#               # configuration
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Platform name for HP ProCurve.
pub const PLATFORM_NAME: &str = "hp_procurve";

/// Create the HP ProCurve platform definition.
pub fn platform() -> PlatformDefinition {
    let operator = PrivilegeLevel::new("operator", r"(?mi)^[\w.\-@/: ]{1,63}>\s?\z").unwrap();

    let manager = PrivilegeLevel::new("manager", r"(?mi)^[\w.\-@/: ]{1,63}#\s?\z")
        .unwrap()
        .with_parent("operator")
        .with_escalate("enable")
        .with_auth(r"(?mi)password:\s?\z")
        .unwrap()
        .with_not_contains("(config");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^[\w.\-@/: ]{1,63}\(config[\w.\-@/:+]{0,32}\)#\s?\z",
    )
    .unwrap()
    .with_parent("manager")
    .with_escalate("configure");

    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(operator)
        .with_privilege(manager)
        .with_privilege(configuration)
        .with_default_privilege("manager")
        .with_failure_pattern("Invalid input")
        .with_failure_pattern("Ambiguous input")
        .with_failure_pattern("Incomplete input")
        .with_on_open_command("no page")
}
