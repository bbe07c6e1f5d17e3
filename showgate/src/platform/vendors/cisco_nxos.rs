//! Cisco NX-OS platform definition.
//!
//! ```text
//! nexus>                  # exec mode (rare, RBAC-restricted users)
//! nexus#                  # privilege_exec mode
//! nexus(maint-mode)#      # maintenance profile, still privileged
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the NX-OS platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", r"(?mi)^[\w.\-]{1,63}>\s?$").unwrap();

    let privilege_exec = PrivilegeLevel::new(
        "privilege_exec",
        r"(?mi)^[\w.\-]{1,63}(?:\(maint-mode\))?#\s?$",
    )
    .unwrap()
    .with_parent("exec")
    .with_escalate("enable")
    .with_auth(r"(?mi)^password:\s?$")
    .unwrap()
    .with_not_contains("(config");

    PlatformDefinition::new("cisco_nxos")
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_default_privilege("privilege_exec")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid command")
        .with_failure_pattern("% Invalid parameter detected")
        .with_failure_pattern("% Invalid number")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
        .with_terminal_size(511, 24)
}
