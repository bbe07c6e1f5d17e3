//! Response type for command execution results.

use std::time::Duration;

use crate::error::ExecutionError;

/// Output of one command sent over an interactive session.
#[derive(Debug, Clone)]
pub struct Response {
    /// The text that was sent.
    pub command: String,

    /// Output with the command echo and trailing prompt removed.
    pub result: String,

    /// Output before normalization.
    pub raw_result: String,

    /// The prompt that ended the read.
    pub prompt: String,

    pub elapsed: Duration,

    /// Device failure pattern found in the output, if any.
    pub failure_message: Option<String>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }

    /// Normalized output, or [`ExecutionError::CommandFailed`] carrying it.
    pub fn into_result(self) -> Result<String, ExecutionError> {
        match self.failure_message {
            None => Ok(self.result),
            Some(pattern) => Err(ExecutionError::CommandFailed {
                message: format!("device reported '{}'", pattern),
                output: self.result,
            }),
        }
    }
}
