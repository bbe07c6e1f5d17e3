//! Cisco IOS and IOS-XE platform definition.
//!
//! Both dialects share prompts and error strings, so one definition serves
//! both under different names.
//!
//! Prompt patterns are adapted from [scrapli](https://github.com/carlmontanari/scrapli).
//!
//! # Prompt Examples
//!
//! ```text
//! router>                 # exec mode
//! router#                 # privilege_exec mode
//! router(config)#         # configuration mode (never entered, excluded from privilege_exec)
//! ```
//!
//! # Privilege Graph
//!
//! ```text
//! ┌──────┐  enable (+ password)  ┌────────────────┐
//! │ exec ├───────────────────────► privilege_exec │
//! │  >   │                       │       #        │
//! └──────┘                       └────────────────┘
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the IOS/IOS-XE platform definition under the given name.
pub fn platform(name: &str) -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", r"(?mi)^[\w.\-@/:]{1,63}>\s?$").unwrap();

    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?mi)^[\w.\-@/:]{1,63}#\s?$")
        .unwrap()
        .with_parent("exec")
        .with_escalate("enable")
        .with_auth(r"(?mi)^(?:enable\s)?password:\s?$")
        .unwrap()
        .with_not_contains("(config");

    PlatformDefinition::new(name)
        .with_privilege(exec)
        .with_privilege(privilege_exec)
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
    fn test_ios_platform() {
        let platform = platform("cisco_iosxe");
        assert_eq!(platform.name, "cisco_iosxe");
        assert_eq!(platform.privilege_levels.len(), 2);
        assert_eq!(platform.default_privilege, "privilege_exec");
    }

    #[test]
    fn test_exec_prompt_match() {
        let platform = platform("cisco_ios");
        let exec = platform.get_privilege("exec").unwrap();

        assert!(exec.matches("router>"));
        assert!(exec.matches("core-sw01.lab>"));
        assert!(!exec.matches("router#"));
    }

    #[test]
    fn test_privilege_exec_prompt_match() {
        let platform = platform("cisco_ios");
        let priv_exec = platform.get_privilege("privilege_exec").unwrap();

        assert!(priv_exec.matches("router#"));
        assert!(priv_exec.matches("router# "));
        assert!(!priv_exec.matches("router(config)#"));
        assert!(!priv_exec.matches("router(config-if)#"));
        assert!(!priv_exec.matches("router>"));
    }

    #[test]
    fn test_enable_requires_password() {
        let platform = platform("cisco_ios");
        let priv_exec = platform.get_privilege("privilege_exec").unwrap();
        let auth = priv_exec.escalate_prompt.as_ref().unwrap();

        assert!(auth.is_match(b"Password: "));
        assert!(auth.is_match(b"enable password:"));
    }

    #[test]
    fn test_paging_disabled_on_open() {
        let platform = platform("cisco_ios");
        assert!(
            platform
                .on_open_commands
                .contains(&"terminal length 0".to_string())
        );
    }
}
