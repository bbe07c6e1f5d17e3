//! Platform definition for vendor-specific configurations.

use indexmap::IndexMap;
use regex::bytes::Regex;

use super::privilege_level::PrivilegeLevel;

/// Everything the SSH driver needs to know about a CLI dialect.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "cisco_iosxe", "cisco_nxos").
    pub name: String,

    /// Privilege levels for this platform.
    pub privilege_levels: IndexMap<String, PrivilegeLevel>,

    /// Level show commands are run from.
    pub default_privilege: String,

    /// Output substrings that mark a command as failed.
    pub failed_when_contains: Vec<String>,

    /// Commands to run when connection is established (paging, width).
    pub on_open_commands: Vec<String>,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,
}

impl PlatformDefinition {
    /// Create a new platform definition with minimal required fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            privilege_levels: IndexMap::new(),
            default_privilege: String::new(),
            failed_when_contains: vec![],
            on_open_commands: vec![],
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    /// Add a privilege level.
    pub fn with_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_levels.insert(level.name.clone(), level);
        self
    }

    /// Set the default privilege level.
    pub fn with_default_privilege(mut self, name: impl Into<String>) -> Self {
        self.default_privilege = name.into();
        self
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Get a privilege level by name.
    pub fn get_privilege(&self, name: &str) -> Option<&PrivilegeLevel> {
        self.privilege_levels.get(name)
    }

    /// One regex matching the prompt of any privilege level.
    pub fn prompt_pattern(&self) -> Result<Regex, regex::Error> {
        let combined = self
            .privilege_levels
            .values()
            .map(|level| format!("(?:{})", level.pattern.as_str()))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&combined)
    }

    /// Strip the command echo and the trailing prompt from raw session output.
    pub fn normalize_output(&self, raw: &str, command: &str) -> String {
        let unix = raw.replace("\r\n", "\n").replace('\r', "");
        let body = unix.trim_start_matches('\n');
        let body = body
            .strip_prefix(command)
            .unwrap_or(body)
            .trim_start_matches('\n');

        // The last line is the prompt that ended the read.
        match memchr::memrchr(b'\n', body.as_bytes()) {
            Some(pos) => body[..pos].trim_end().to_string(),
            None => String::new(),
        }
    }

    /// First failure pattern present in the output.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PlatformDefinition {
        PlatformDefinition::new("sample")
            .with_privilege(PrivilegeLevel::new("exec", r"(?m)^\w+>\s?$").unwrap())
            .with_privilege(
                PrivilegeLevel::new("privilege_exec", r"(?m)^\w+#\s?$")
                    .unwrap()
                    .with_parent("exec"),
            )
            .with_default_privilege("privilege_exec")
            .with_failure_pattern("% Invalid input")
    }

    #[test]
    fn test_normalize_strips_echo_and_prompt() {
        let raw = "show clock\r\n*10:15:01.123 UTC Mon Mar 3 2025\r\nrouter#";
        assert_eq!(
            sample().normalize_output(raw, "show clock"),
            "*10:15:01.123 UTC Mon Mar 3 2025"
        );
    }

    #[test]
    fn test_normalize_prompt_only() {
        assert_eq!(sample().normalize_output("show clock\r\nrouter#", "show clock"), "");
    }

    #[test]
    fn test_combined_prompt_pattern() {
        let pattern = sample().prompt_pattern().unwrap();
        assert!(pattern.is_match(b"output\nrouter>"));
        assert!(pattern.is_match(b"output\nrouter#"));
        assert!(!pattern.is_match(b"output\nrouter$"));
    }

    #[test]
    fn test_detect_failure() {
        let platform = sample();
        assert_eq!(
            platform.detect_failure("        ^\n% Invalid input detected at '^' marker."),
            Some("% Invalid input")
        );
        assert_eq!(platform.detect_failure("Cisco IOS XE Software"), None);
    }
}
