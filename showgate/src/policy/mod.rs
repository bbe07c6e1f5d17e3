//! Read-only command policy.
//!
//! Every command in a request passes through [`CommandEntry::validate`] before
//! any device is contacted. Validation is pure and synchronous. A command is
//! accepted only if it starts with `show`, stays within length bounds, and
//! contains no shell metacharacters or state-changing keywords. A filter
//! pattern must pass a narrower metacharacter check.
//!
//! ```
//! use showgate::policy::CommandEntry;
//!
//! let entry = CommandEntry::new("show version; reload");
//! let err = entry.validate().unwrap_err();
//! assert_eq!(err.token.as_deref(), Some(";"));
//! ```

pub mod denylist;
mod filter;

pub use filter::{FilterClause, FilterOperator};

use serde::Deserialize;

use crate::error::PolicyViolation;
use crate::platform::PlatformFamily;

/// Maximum command length in characters.
pub const MAX_COMMAND_LEN: usize = 1000;

/// Maximum filter pattern length in characters.
pub const MAX_PATTERN_LEN: usize = 500;

/// A command as submitted: either a bare string or an object with filter fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "CommandEntryRepr")]
pub struct CommandEntry {
    pub command: String,
    pub pipe_option: Option<FilterOperator>,
    pub pipe_value: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CommandEntryRepr {
    Plain(String),
    Full {
        command: String,
        #[serde(default, alias = "filter")]
        pipe_option: Option<FilterOperator>,
        #[serde(default, alias = "pattern")]
        pipe_value: Option<String>,
    },
}

impl From<CommandEntryRepr> for CommandEntry {
    fn from(repr: CommandEntryRepr) -> Self {
        match repr {
            CommandEntryRepr::Plain(command) => CommandEntry::new(command),
            CommandEntryRepr::Full {
                command,
                pipe_option,
                pipe_value,
            } => CommandEntry {
                command,
                pipe_option,
                pipe_value,
            },
        }
    }
}

impl CommandEntry {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            pipe_option: None,
            pipe_value: None,
        }
    }

    pub fn with_filter(mut self, operator: FilterOperator, pattern: impl Into<String>) -> Self {
        self.pipe_option = Some(operator);
        self.pipe_value = Some(pattern.into());
        self
    }

    /// Check the entry against the policy.
    pub fn validate(&self) -> Result<ValidatedCommand, PolicyViolation> {
        validate_command(&self.command)?;

        let filter = match (self.pipe_option, self.pipe_value.as_deref()) {
            (None, None) => None,
            (None, Some(pattern)) if pattern.trim().is_empty() => None,
            (None, Some(_)) => {
                return Err(PolicyViolation::new(
                    "pipe_value",
                    "pipe_value given without pipe_option",
                ));
            }
            (Some(operator), pattern) => {
                let pattern = pattern.unwrap_or_default().trim();
                validate_filter_pattern(pattern)?;
                Some(FilterClause {
                    operator,
                    pattern: pattern.to_string(),
                })
            }
        };

        Ok(ValidatedCommand {
            command: self.command.trim().to_string(),
            filter,
        })
    }
}

/// Check a command string against the read-only policy.
pub fn validate_command(command: &str) -> Result<(), PolicyViolation> {
    if command.trim().is_empty() {
        return Err(PolicyViolation::new("command", "Command cannot be empty"));
    }

    if command.chars().count() > MAX_COMMAND_LEN {
        return Err(PolicyViolation::new(
            "command",
            format!(
                "Command exceeds maximum length of {} characters",
                MAX_COMMAND_LEN
            ),
        ));
    }

    if !denylist::READ_ONLY_PREFIX.is_match(command) {
        return Err(PolicyViolation::new(
            "command",
            "Only 'show' commands are allowed",
        ));
    }

    if let Some((token, position)) = denylist::find_token(command, denylist::COMMAND_TOKENS) {
        return Err(PolicyViolation::at_token("command", token, position));
    }

    if let Some((keyword, position)) = denylist::find_keyword(command) {
        return Err(PolicyViolation::at_keyword("command", keyword, position));
    }

    Ok(())
}

/// Check a filter pattern.
pub fn validate_filter_pattern(pattern: &str) -> Result<(), PolicyViolation> {
    if pattern.is_empty() {
        return Err(PolicyViolation::new(
            "pipe_value",
            "pipe_value cannot be empty when pipe_option is set",
        ));
    }

    if pattern.chars().count() > MAX_PATTERN_LEN {
        return Err(PolicyViolation::new(
            "pipe_value",
            format!(
                "pipe_value exceeds maximum length of {} characters",
                MAX_PATTERN_LEN
            ),
        ));
    }

    if let Some((token, position)) = denylist::find_token(pattern, denylist::FILTER_TOKENS) {
        return Err(PolicyViolation::at_token("pipe_value", token, position));
    }

    Ok(())
}

/// A command that passed the policy. Immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCommand {
    command: String,
    filter: Option<FilterClause>,
}

impl ValidatedCommand {
    /// The base command, without filter.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn filter(&self) -> Option<&FilterClause> {
        self.filter.as_ref()
    }

    /// Reject filters the family cannot express.
    pub fn check_supported(&self, family: PlatformFamily) -> Result<(), PolicyViolation> {
        match &self.filter {
            Some(filter) if filter.render(family).is_none() => Err(PolicyViolation::new(
                "pipe_option",
                format!(
                    "'{}' filter is not available on {}",
                    filter.operator,
                    family.display_name()
                ),
            )),
            _ => Ok(()),
        }
    }

    /// The text sent to the device: `<command> | <operator> <pattern>`.
    pub fn compose(&self, family: PlatformFamily) -> String {
        match &self.filter {
            None => self.command.clone(),
            Some(filter) => {
                let suffix = filter.render(family).unwrap_or_else(|| {
                    format!("| {} {}", filter.operator, filter.pattern)
                });
                format!("{} {}", self.command, suffix)
            }
        }
    }
}
