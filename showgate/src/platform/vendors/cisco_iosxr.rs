//! Cisco IOS-XR platform definition.
//!
//! IOS-XR logs users straight into privileged mode, so there is a single level.
//!
//! ```text
//! RP/0/RSP0/CPU0:pe1#     # privilege_exec mode
//! RP/0/RSP0/CPU0:pe1(config)#
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the IOS-XR platform definition.
pub fn platform() -> PlatformDefinition {
    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?mi)^[\w.\-@/:]{1,63}#\s?$")
        .unwrap()
        .with_not_contains("(config");

    PlatformDefinition::new("cisco_iosxr")
        .with_privilege(privilege_exec)
        .with_default_privilege("privilege_exec")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% No such configuration item")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 512")
        .with_terminal_size(512, 24)
}
