//! Batch orchestration: one request, many devices.
//!
//! Everything that can be checked without a network is checked first. Any
//! invalid command rejects the whole request before any device is contacted.
//! Then every device descriptor and its route are validated, collecting all
//! violations. Only a fully valid request is dispatched.

use futures_util::StreamExt;
use futures_util::stream;
use log::info;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::ServiceConfig;
use crate::device::{DeviceSpec, DeviceTarget};
use crate::error::{DescriptorInvalid, Error, FieldViolation, Result};
use crate::executor::{Connector, DeviceExecutor, ExecOptions, OutputMode, SshConnector};
use crate::parse::{OutputParser, TextFsmParser};
use crate::policy::{CommandEntry, ValidatedCommand};
use crate::result::{BatchResult, DeviceResult};
use crate::routing::{RelaySpec, Route, Router};

/// Message recorded for devices skipped by cancellation.
pub const CANCELLED: &str = "request cancelled before device was contacted";

/// A show-command request as received from a caller.
#[derive(Debug, Clone, Deserialize)]
pub struct ShowRequest {
    #[serde(default)]
    pub devices: Vec<DeviceSpec>,

    #[serde(default)]
    pub commands: Vec<CommandEntry>,

    /// Connect and per-command timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,

    #[serde(default, alias = "output_mode")]
    pub output_format: OutputMode,

    /// Route through the configured default relay.
    #[serde(default)]
    pub use_jumphost: bool,

    /// Relay for every device of this request.
    #[serde(default)]
    pub jumphost: Option<RelaySpec>,
}

/// A request that passed every pre-flight check.
#[derive(Debug)]
pub struct PreparedBatch {
    pub devices: Vec<(DeviceTarget, Route)>,
    pub commands: Vec<ValidatedCommand>,
    pub options: ExecOptions,
}

/// Validates requests and runs them across devices.
pub struct Orchestrator<'a, C = SshConnector, P = TextFsmParser> {
    config: &'a ServiceConfig,
    connector: C,
    parser: P,
}

impl<'a> Orchestrator<'a> {
    /// Orchestrator with SSH sessions and the built-in TextFSM templates.
    pub fn ssh(config: &'a ServiceConfig) -> Self {
        Self::new(config, SshConnector::from_config(config), TextFsmParser::new())
    }
}

impl<'a, C, P> Orchestrator<'a, C, P>
where
    C: Connector,
    P: OutputParser,
{
    pub fn new(config: &'a ServiceConfig, connector: C, parser: P) -> Self {
        Self {
            config,
            connector,
            parser,
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run every pre-flight check.
    ///
    /// Commands first, each failure reporting its index. Then the device
    /// list, collecting violations across all devices. Last, filters a
    /// device's platform cannot express.
    pub fn prepare(&self, request: &ShowRequest) -> Result<PreparedBatch> {
        let commands = request
            .commands
            .iter()
            .enumerate()
            .map(|(i, entry)| entry.validate().map_err(|v| v.for_command(i)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut violations = Vec::new();

        if request.devices.is_empty() {
            violations.push(FieldViolation::new("devices", "At least one device is required"));
        }
        if commands.is_empty() {
            violations.push(FieldViolation::new("commands", "At least one command is required"));
        }

        let timeout = match self.config.effective_timeout(request.timeout) {
            Ok(timeout) => Some(timeout),
            Err(v) => {
                violations.push(v);
                None
            }
        };

        let request_relay = match request.jumphost.as_ref().map(RelaySpec::validate) {
            Some(Ok(relay)) => Some(relay),
            Some(Err(invalid)) => {
                violations.extend(invalid.violations.into_iter().map(|v| v.prefixed("jumphost")));
                None
            }
            None => None,
        };

        let router = Router::new(self.config.relay.as_ref());
        let mut devices = Vec::with_capacity(request.devices.len());

        for (i, spec) in request.devices.iter().enumerate() {
            let prefix = format!("devices[{}]", i);
            let target = match DeviceTarget::try_from_spec(spec) {
                Ok(target) => target,
                Err(invalid) => {
                    violations.extend(invalid.violations.into_iter().map(|v| v.prefixed(&prefix)));
                    continue;
                }
            };
            match router.route(&target, request_relay.as_ref(), request.use_jumphost) {
                Ok(route) => devices.push((target, route)),
                Err(v) => violations.push(v.prefixed(&prefix)),
            }
        }

        let timeout = match timeout {
            Some(timeout) if violations.is_empty() => timeout,
            _ => return Err(DescriptorInvalid::new(violations).into()),
        };

        for (target, _) in &devices {
            for (i, command) in commands.iter().enumerate() {
                command
                    .check_supported(target.platform())
                    .map_err(|v| Error::Policy(v.for_command(i)))?;
            }
        }

        Ok(PreparedBatch {
            devices,
            commands,
            options: ExecOptions {
                timeout,
                output_mode: request.output_format,
            },
        })
    }

    /// Validate and run a request.
    ///
    /// Devices run in request order, at most `max_concurrency` at a time, and
    /// results keep that order. Once `cancel` fires, devices not yet started
    /// are reported as cancelled; running ones finish.
    pub async fn execute(
        &self,
        request: &ShowRequest,
        cancel: &CancellationToken,
    ) -> Result<BatchResult> {
        let batch = self.prepare(request)?;
        Ok(self.run(batch, cancel).await)
    }

    /// Dispatch a prepared batch.
    pub async fn run(&self, batch: PreparedBatch, cancel: &CancellationToken) -> BatchResult {
        let PreparedBatch {
            devices,
            commands,
            options,
        } = batch;
        let concurrency = self.config.max_concurrency.max(1);

        info!(
            "Running {} command(s) on {} device(s), concurrency {}",
            commands.len(),
            devices.len(),
            concurrency
        );

        let commands = &commands;
        let results: Vec<DeviceResult> = stream::iter(devices)
            .map(|(target, route)| async move {
                if cancel.is_cancelled() {
                    return DeviceResult::unreachable(
                        target.hostname(),
                        target.platform(),
                        route.to_string(),
                        CANCELLED,
                    );
                }
                DeviceExecutor::new(&self.connector, &self.parser, options)
                    .run(target, route, commands)
                    .await
            })
            .buffered(concurrency)
            .collect()
            .await;

        let batch = BatchResult::from_devices(results);
        info!(
            "Batch complete: {}/{} devices succeeded",
            batch.succeeded_devices, batch.total_devices
        );
        batch
    }
}
