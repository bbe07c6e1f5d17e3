//! Result records returned to the caller.
//!
//! Records are built once per request and never mutated afterwards.

use serde::Serialize;
use serde_json::Value;

use crate::platform::PlatformFamily;

/// Outcome of one command on one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResult {
    /// The text sent to the device, filter suffix included.
    pub command: String,

    /// Raw output. Kept even when structured output was requested.
    pub output: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<Value>,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Why structured parsing failed. Independent of `success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,

    pub elapsed_ms: u64,
}

impl CommandResult {
    pub fn succeeded(command: impl Into<String>, output: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
            parsed: None,
            success: true,
            error: None,
            parse_error: None,
            elapsed_ms,
        }
    }

    pub fn failed(
        command: impl Into<String>,
        output: impl Into<String>,
        error: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
            parsed: None,
            success: false,
            error: Some(error.into()),
            parse_error: None,
            elapsed_ms,
        }
    }

    /// A command skipped because the session was already gone.
    pub fn not_attempted(command: impl Into<String>) -> Self {
        Self::failed(command, "", "not attempted: session disconnected", 0)
    }
}

/// Outcome for one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceResult {
    pub hostname: String,

    pub platform: PlatformFamily,

    /// `direct` or `relay:<host>:<port>`.
    pub route: String,

    /// False only on a connection-level error.
    pub success: bool,

    pub commands: Vec<CommandResult>,

    /// Connection-level error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeviceResult {
    /// The device was reached. `error` is set if the session was lost midway.
    pub fn connected(
        hostname: impl Into<String>,
        platform: PlatformFamily,
        route: impl Into<String>,
        commands: Vec<CommandResult>,
        error: Option<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            platform,
            route: route.into(),
            success: error.is_none(),
            commands,
            error,
        }
    }

    /// The device could not be reached. No command results.
    pub fn unreachable(
        hostname: impl Into<String>,
        platform: PlatformFamily,
        route: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            platform,
            route: route.into(),
            success: false,
            commands: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Number of commands that succeeded.
    pub fn succeeded_commands(&self) -> usize {
        self.commands.iter().filter(|c| c.success).count()
    }
}

/// Outcome of a whole request, devices in request order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub results: Vec<DeviceResult>,
    pub total_devices: usize,
    pub succeeded_devices: usize,
    pub failed_devices: usize,
}

impl BatchResult {
    pub fn from_devices(results: Vec<DeviceResult>) -> Self {
        let total_devices = results.len();
        let succeeded_devices = results.iter().filter(|r| r.success).count();
        Self {
            results,
            total_devices,
            succeeded_devices,
            failed_devices: total_devices - succeeded_devices,
        }
    }
}
