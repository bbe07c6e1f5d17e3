//! Cisco ASA platform definition.
//!
//! ASA disables paging with `terminal pager 0` rather than `terminal length 0`,
//! and has no `| section` filter.
//!
//! ```text
//! fw01>                   # exec mode
//! fw01#                   # privilege_exec mode
//! fw01/admin#             # multi-context, admin context
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the ASA platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", r"(?mi)^[\w.\-@/:]{1,63}>\s?$").unwrap();

    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?mi)^[\w.\-@/:]{1,63}#\s?$")
        .unwrap()
        .with_parent("exec")
        .with_escalate("enable")
        .with_auth(r"(?mi)^password:\s?$")
        .unwrap()
        .with_not_contains("(config");

    PlatformDefinition::new("cisco_asa")
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_default_privilege("privilege_exec")
        .with_failure_pattern("ERROR: % Invalid input detected")
        .with_failure_pattern("ERROR: % Incomplete command")
        .with_failure_pattern("ERROR: % Ambiguous command")
        .with_failure_pattern("ERROR: Command authorization failed")
        .with_on_open_command("terminal pager 0")
        .with_terminal_size(511, 24)
}
