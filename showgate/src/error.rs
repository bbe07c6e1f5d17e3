//! Error types for showgate.
//!
//! Errors are split by the scope they affect:
//!
//! - [`Error`] rejects a whole request before any device is contacted
//!   (command policy, descriptor validation, configuration).
//! - [`TransportError`] is device-scoped: the session could not be opened.
//! - [`ExecutionError`] is command-scoped: one command failed on an open session.
//! - [`ParseError`] is additive to a successful command and never escalates.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

/// Request-level error. Always surfaced to the caller as a client-side rejection
/// (or, for [`Error::Config`], a startup failure).
#[derive(Error, Debug)]
pub enum Error {
    /// A command or filter failed the read-only command policy.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    /// A device, relay or request field is malformed.
    #[error(transparent)]
    Descriptor(#[from] DescriptorInvalid),

    /// Process configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether the error was caused by the request contents (a 4xx at an HTTP boundary).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Policy(_) | Error::Descriptor(_))
    }
}

/// A command or filter string rejected by the command policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("command policy violation in {field}: {message}")]
pub struct PolicyViolation {
    /// Which field was rejected (`command` or `pipe_value`).
    pub field: &'static str,

    /// The offending token, when the rejection is caused by one.
    pub token: Option<String>,

    /// Character offset of the offending token.
    pub position: Option<usize>,

    /// Human-readable explanation.
    pub message: String,

    /// Index of the command within the request, filled in by the orchestrator.
    pub command_index: Option<usize>,
}

impl PolicyViolation {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            token: None,
            position: None,
            message: message.into(),
            command_index: None,
        }
    }

    pub(crate) fn at_token(field: &'static str, token: &str, position: usize) -> Self {
        Self {
            field,
            token: Some(token.to_string()),
            position: Some(position),
            message: format!(
                "contains disallowed character '{}' at position {}",
                printable(token),
                position
            ),
            command_index: None,
        }
    }

    pub(crate) fn at_keyword(field: &'static str, keyword: &str, position: usize) -> Self {
        Self {
            field,
            token: Some(keyword.to_string()),
            position: Some(position),
            message: format!(
                "contains state-changing keyword '{}' at position {}",
                keyword, position
            ),
            command_index: None,
        }
    }

    pub(crate) fn for_command(mut self, index: usize) -> Self {
        self.command_index = Some(index);
        self
    }
}

/// Render control characters the way they would be typed.
fn printable(token: &str) -> String {
    token
        .chars()
        .map(|c| match c {
            '\n' => "\\n".to_string(),
            '\r' => "\\r".to_string(),
            '\0' => "\\0".to_string(),
            c => c.to_string(),
        })
        .collect()
}

/// One invalid field of a device, relay or request descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Dotted field path, e.g. `devices[1].port`.
    pub field: String,

    /// What is wrong with it.
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn prefixed(mut self, prefix: &str) -> Self {
        self.field = format!("{}.{}", prefix, self.field);
        self
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every violation found while validating a descriptor, not just the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct DescriptorInvalid {
    pub violations: Vec<FieldViolation>,
}

impl DescriptorInvalid {
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    /// Whether any violation concerns the named field (suffix match on the path).
    pub fn mentions(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field.ends_with(field))
    }
}

impl From<FieldViolation> for DescriptorInvalid {
    fn from(violation: FieldViolation) -> Self {
        Self::new(vec![violation])
    }
}

impl fmt::Display for DescriptorInvalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid descriptor: ")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

/// Process configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("invalid value '{value}' for {name}: {message}")]
    InvalidValue {
        name: &'static str,
        value: String,
        message: String,
    },

    /// A relay was partially configured.
    #[error("{name} must be set when JUMPHOST_HOST is set")]
    MissingVar { name: &'static str },

    /// The configured relay failed descriptor validation.
    #[error("invalid jumphost configuration: {0}")]
    InvalidRelay(DescriptorInvalid),
}

/// Connection-level errors (SSH connect, relay, authentication, session setup).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to reach the host (DNS, refused, unreachable).
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// The relay host could not be used to reach the target.
    #[error("Jumphost {host} failed: {message}")]
    Relay { host: String, message: String },

    /// Host key not present in known_hosts (strict checking).
    #[error("Host key for {host}:{port} is not in known_hosts")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts.
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written.
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// The interactive shell never produced a recognisable prompt.
    #[error("Session setup failed: {0}")]
    Channel(#[from] ChannelError),

    /// Could not reach the privilege level needed to run show commands.
    #[error("Failed to acquire privilege level '{target}'")]
    PrivilegeAcquisitionFailed { target: String },

    /// Running a session setup command (e.g. disabling paging) failed.
    #[error("Session setup command '{command}' failed: {message}")]
    SetupCommandFailed { command: String, message: String },
}

/// PTY channel errors (prompt matching, channel lifetime).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Prompt was not seen within the deadline.
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),
}

/// Command-level errors. Recorded in the command's result; the device carries on.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The command did not finish within its timeout.
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// The device reported an error for the command (e.g. `% Invalid input`).
    #[error("Command failed: {message}")]
    CommandFailed { message: String, output: String },

    /// The session went away while the command was running.
    #[error("Session disconnected")]
    Disconnected,

    /// No open session.
    #[error("Session not connected")]
    NotConnected,

    /// SSH protocol error while sending the command.
    #[error("Channel error: {0}")]
    Channel(ChannelError),
}

impl ExecutionError {
    /// Whether this failure means the session itself is gone.
    pub fn is_connection_level(&self) -> bool {
        matches!(self, ExecutionError::Disconnected | ExecutionError::NotConnected)
    }

    /// Output the device returned before the failure was detected.
    pub fn output(&self) -> &str {
        match self {
            ExecutionError::CommandFailed { output, .. } => output,
            _ => "",
        }
    }
}

impl From<ChannelError> for ExecutionError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::PatternTimeout(timeout) => ExecutionError::Timeout(timeout),
            ChannelError::Closed => ExecutionError::Disconnected,
            other => ExecutionError::Channel(other),
        }
    }
}

/// Structured-output parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No template is registered for this platform/command pair.
    #[error("no parser template for '{command}' on {platform}")]
    NoTemplate { platform: String, command: String },

    /// The template itself failed to compile.
    #[error("invalid template '{template}': {message}")]
    Template { template: String, message: String },

    /// The output did not parse.
    #[error("failed to parse output: {0}")]
    Output(String),
}

/// Result type alias using showgate's request-level Error.
pub type Result<T> = std::result::Result<T, Error>;
