//! Privilege level definition.

use regex::bytes::Regex;

/// One privilege level of a device CLI.
///
/// Levels form a tree through `parent`. A level is entered from its parent
/// with `escalate_command`, optionally answering an authentication prompt.
#[derive(Debug, Clone)]
pub struct PrivilegeLevel {
    /// Name of this privilege level (e.g. "exec", "privilege_exec").
    pub name: String,

    /// Regex pattern matching the prompt at this level.
    pub pattern: Regex,

    /// Level this one is entered from (None for the root).
    pub parent: Option<String>,

    /// Command that enters this level from the parent.
    pub escalate_command: Option<String>,

    /// Pattern of the password prompt shown while escalating, if any.
    pub escalate_prompt: Option<Regex>,

    /// Strings that must NOT be in the prompt for this level to match.
    /// Used for disambiguation (e.g. "#" matches both privileged and config modes).
    pub not_contains: Vec<String>,
}

impl PrivilegeLevel {
    /// Create a root privilege level.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            parent: None,
            escalate_command: None,
            escalate_prompt: None,
            not_contains: vec![],
        })
    }

    /// Set the parent privilege level.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the escalation command.
    pub fn with_escalate(mut self, command: impl Into<String>) -> Self {
        self.escalate_command = Some(command.into());
        self
    }

    /// Require a password when escalating.
    pub fn with_auth(mut self, prompt_pattern: &str) -> Result<Self, regex::Error> {
        self.escalate_prompt = Some(Regex::new(prompt_pattern)?);
        Ok(self)
    }

    /// Add a not_contains pattern.
    pub fn with_not_contains(mut self, pattern: impl Into<String>) -> Self {
        self.not_contains.push(pattern.into());
        self
    }

    /// Check if this privilege level matches a prompt.
    pub fn matches(&self, prompt: &str) -> bool {
        if self.not_contains.iter().any(|nc| prompt.contains(nc.as_str())) {
            return false;
        }
        self.pattern.is_match(prompt.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_contains_disambiguates() {
        let level = PrivilegeLevel::new("privilege_exec", r"#\s*$")
            .unwrap()
            .with_not_contains("(config");

        assert!(level.matches("router#"));
        assert!(!level.matches("router(config)#"));
    }

    #[test]
    fn test_escalation_fields() {
        let level = PrivilegeLevel::new("privilege_exec", r"#\s*$")
            .unwrap()
            .with_parent("exec")
            .with_escalate("enable")
            .with_auth(r"[Pp]assword:\s*$")
            .unwrap();

        assert_eq!(level.parent.as_deref(), Some("exec"));
        assert_eq!(level.escalate_command.as_deref(), Some("enable"));
        assert!(level.escalate_prompt.is_some());
    }
}
