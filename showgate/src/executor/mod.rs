//! Per-device execution.
//!
//! A [`DeviceExecutor`] owns one device for the duration of a request: it
//! opens a session through a [`Connector`], runs every validated command in
//! order, and closes the session exactly once on every path. Command
//! failures are recorded and execution carries on. Only a lost session
//! stops the run early and fails the device.
//!
//! ```text
//! Idle -> Connecting -> Connected -> Executing -> Closing -> Closed
//!              |                         |
//!              +--------> Failed <-------+
//! ```

mod ssh;

pub use ssh::{CliSession, SshConnector};

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Deserialize;

use crate::device::DeviceTarget;
use crate::error::{ExecutionError, TransportError};
use crate::parse::OutputParser;
use crate::platform::PlatformFamily;
use crate::policy::ValidatedCommand;
use crate::result::{CommandResult, DeviceResult};
use crate::routing::Route;

/// Opens sessions to devices.
pub trait Connector: Send + Sync {
    type Session: Session;

    /// Open an authenticated session ready for show commands.
    fn open_session(
        &self,
        target: &DeviceTarget,
        route: &Route,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Session, TransportError>> + Send;
}

/// One open device session.
pub trait Session: Send + Sized {
    /// Run one command and return its normalized output.
    fn execute(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, ExecutionError>> + Send;

    /// Get back to a clean prompt after a command timed out, discarding
    /// its late output. A session that cannot recover must report itself
    /// dead afterwards.
    fn recover(&mut self, timeout: Duration) -> impl Future<Output = ()> + Send;

    /// Whether the session can still take commands.
    fn is_alive(&self) -> bool;

    /// Release the session. Never fails; problems are logged.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Whether structured output is wanted in addition to raw text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Raw,
    #[serde(alias = "structured")]
    Parsed,
    Both,
}

impl OutputMode {
    pub fn wants_parsed(&self) -> bool {
        matches!(self, OutputMode::Parsed | OutputMode::Both)
    }
}

/// Lifecycle of one device within a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Idle,
    Connecting,
    Connected,
    Executing,
    Closing,
    Closed,
    Failed,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceState::Idle => "idle",
            DeviceState::Connecting => "connecting",
            DeviceState::Connected => "connected",
            DeviceState::Executing => "executing",
            DeviceState::Closing => "closing",
            DeviceState::Closed => "closed",
            DeviceState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Settings shared by every device of a request.
#[derive(Debug, Clone, Copy)]
pub struct ExecOptions {
    /// Applied to the connect and to each command separately.
    pub timeout: Duration,
    pub output_mode: OutputMode,
}

/// Runs one device's command list.
pub struct DeviceExecutor<'a, C, P: ?Sized> {
    connector: &'a C,
    parser: &'a P,
    options: ExecOptions,
    state: DeviceState,
}

impl<'a, C, P> DeviceExecutor<'a, C, P>
where
    C: Connector,
    P: OutputParser + ?Sized,
{
    pub fn new(connector: &'a C, parser: &'a P, options: ExecOptions) -> Self {
        Self {
            connector,
            parser,
            options,
            state: DeviceState::Idle,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    fn transition(&mut self, hostname: &str, next: DeviceState) {
        debug!("{}: {} -> {}", hostname, self.state, next);
        self.state = next;
    }

    /// Connect, run `commands` in order, disconnect.
    pub async fn run(
        &mut self,
        target: DeviceTarget,
        route: Route,
        commands: &[ValidatedCommand],
    ) -> DeviceResult {
        let hostname = target.hostname().to_string();
        let platform = target.platform();
        let timeout = self.options.timeout;

        self.transition(&hostname, DeviceState::Connecting);
        info!("Connecting to {} ({}, {})", hostname, platform, route);

        let connect = self.connector.open_session(&target, &route, timeout);
        let mut session = match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => return self.unreachable(&hostname, platform, &route, e),
            Err(_) => {
                return self.unreachable(&hostname, platform, &route, TransportError::Timeout(timeout));
            }
        };
        drop(target);

        self.transition(&hostname, DeviceState::Connected);
        info!("Connected to {}", hostname);

        self.transition(&hostname, DeviceState::Executing);
        let mut results = Vec::with_capacity(commands.len());
        let mut lost: Option<String> = None;

        for (i, command) in commands.iter().enumerate() {
            let text = command.compose(platform);

            if !session.is_alive() {
                lost = Some(ExecutionError::Disconnected.to_string());
                results.extend(skipped(&commands[i..], platform));
                break;
            }

            debug!("{}: executing {:?}", hostname, text);
            let start = Instant::now();
            let outcome = match tokio::time::timeout(timeout, session.execute(&text, timeout)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ExecutionError::Timeout(timeout)),
            };
            let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match outcome {
                Ok(output) => results.push(self.record(command, platform, text, output, elapsed_ms)),
                Err(e) => {
                    warn!("{}: {:?} failed: {}", hostname, text, e);
                    let timed_out = matches!(e, ExecutionError::Timeout(_));
                    results.push(CommandResult::failed(text, e.output(), e.to_string(), elapsed_ms));
                    if timed_out {
                        session.recover(timeout).await;
                    }
                    if e.is_connection_level() || !session.is_alive() {
                        let reason = if e.is_connection_level() { e } else { ExecutionError::Disconnected };
                        lost = Some(reason.to_string());
                        results.extend(skipped(&commands[i + 1..], platform));
                        break;
                    }
                }
            }
        }

        match &lost {
            Some(reason) => {
                warn!("{}: session lost: {}", hostname, reason);
                self.transition(&hostname, DeviceState::Failed);
            }
            None => self.transition(&hostname, DeviceState::Closing),
        }

        session.close().await;
        info!("Disconnected from {}", hostname);
        if lost.is_none() {
            self.transition(&hostname, DeviceState::Closed);
        }

        DeviceResult::connected(hostname, platform, route.to_string(), results, lost)
    }

    fn unreachable(
        &mut self,
        hostname: &str,
        platform: PlatformFamily,
        route: &Route,
        err: TransportError,
    ) -> DeviceResult {
        warn!("Connection to {} failed: {}", hostname, err);
        self.transition(hostname, DeviceState::Failed);
        DeviceResult::unreachable(hostname, platform, route.to_string(), err.to_string())
    }

    /// Successful command record, with structured output when asked for.
    fn record(
        &self,
        command: &ValidatedCommand,
        platform: PlatformFamily,
        text: String,
        output: String,
        elapsed_ms: u64,
    ) -> CommandResult {
        let mut result = CommandResult::succeeded(text, output, elapsed_ms);
        if self.options.output_mode.wants_parsed() {
            if command.filter().is_some() {
                result.parse_error = Some("structured output is not available for filtered commands".to_string());
            } else {
                match self.parser.parse(&result.output, platform, command.command()) {
                    Ok(parsed) => result.parsed = Some(parsed),
                    Err(e) => result.parse_error = Some(e.to_string()),
                }
            }
        }
        result
    }
}

fn skipped(
    commands: &[ValidatedCommand],
    platform: PlatformFamily,
) -> impl Iterator<Item = CommandResult> + '_ {
    commands
        .iter()
        .map(move |c| CommandResult::not_attempted(c.compose(platform)))
}
