//! Structured output parsing.
//!
//! Parsing is additive: a parse failure is recorded next to the raw output
//! and never marks the command as failed.

mod textfsm;

pub use textfsm::TextFsmParser;

use serde_json::Value;

use crate::error::ParseError;
use crate::platform::PlatformFamily;

/// Turns raw command output into structured data.
pub trait OutputParser: Send + Sync {
    fn parse(&self, raw: &str, platform: PlatformFamily, command: &str) -> Result<Value, ParseError>;
}

/// A parser that never produces structured output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoParser;

impl OutputParser for NoParser {
    fn parse(&self, _raw: &str, platform: PlatformFamily, command: &str) -> Result<Value, ParseError> {
        Err(ParseError::NoTemplate {
            platform: platform.to_string(),
            command: command.to_string(),
        })
    }
}
