//! H3C / HPE Comware platform definition.
//!
//! Comware has no enable step; the operator account logs straight into
//! user view and the command plan enters system view itself.
//!
//! ```text
//! <core-h3c>                         # user view
//! [core-h3c]                         # system view
//! [core-h3c-luser-manage-ops]        # local-user view
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Platform name for H3C Comware.
pub const PLATFORM_NAME: &str = "hp_comware";

/// Create the H3C Comware platform definition.
pub fn platform() -> PlatformDefinition {
    let user_view = PrivilegeLevel::new("user_view", r"(?m)^<[\w.\-@/: ]{1,63}>\s?\z").unwrap();

    let system_view = PrivilegeLevel::new("system_view", r"(?m)^\[~?\*?[\w.\-@/: ]{1,63}\]\s?\z")
        .unwrap()
        .with_parent("user_view")
        .with_escalate("system-view");

    PlatformDefinition::new(PLATFORM_NAME)
        .with_privilege(user_view)
        .with_privilege(system_view)
        .with_default_privilege("user_view")
        .with_failure_pattern("% Unrecognized command")
        .with_failure_pattern("% Wrong parameter")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Too many parameters")
        .with_failure_pattern("% Ambiguous command")
        .with_on_open_command("screen-length disable")
}
