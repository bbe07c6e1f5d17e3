//! Generic driver implementation that works with any platform.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};

use super::privilege::PrivilegeManager;
use super::response::Response;
use crate::channel::PtyChannel;
use crate::error::{ChannelError, ExecutionError, TransportError};
use crate::platform::PlatformDefinition;
use crate::transport::{AuthMethod, SshConfig, SshTransport};

/// Silence after a prompt that marks the session as back in step.
const RESYNC_QUIET: Duration = Duration::from_millis(200);

/// Used when a platform's prompt patterns cannot be combined.
static FALLBACK_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\S{1,63}[>#$]\s?$").unwrap());

/// Driver for one CLI session on any platform definition.
///
/// Opening the driver connects, waits for the first prompt, escalates to
/// the platform's default privilege level and runs the platform's session
/// setup commands (paging off, terminal width).
pub struct GenericDriver {
    ssh_config: SshConfig,

    platform: PlatformDefinition,

    /// Secret answered at the `enable` password prompt.
    enable_secret: Option<SecretString>,

    /// SSH transport (None when disconnected).
    transport: Option<SshTransport>,

    /// Interactive shell on the transport.
    channel: Option<PtyChannel>,

    privilege_manager: PrivilegeManager,

    /// Default timeout for reads.
    timeout: Duration,

    /// Combined prompt pattern for all privilege levels.
    prompt_pattern: Regex,

    /// A command was sent and its prompt has not been read yet.
    in_flight: bool,

    /// Set when the session could not be resynchronised. Never cleared.
    poisoned: bool,
}

impl GenericDriver {
    pub fn new(
        ssh_config: SshConfig,
        platform: PlatformDefinition,
        enable_secret: Option<SecretString>,
    ) -> Self {
        let timeout = ssh_config.timeout;
        let privilege_manager = PrivilegeManager::new(platform.privilege_levels.clone());
        let prompt_pattern = platform
            .prompt_pattern()
            .unwrap_or_else(|_| FALLBACK_PROMPT.clone());

        Self {
            ssh_config,
            platform,
            enable_secret,
            transport: None,
            channel: None,
            privilege_manager,
            timeout,
            prompt_pattern,
            in_flight: false,
            poisoned: false,
        }
    }

    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// Name of the privilege level the session is at.
    pub fn current_privilege(&self) -> Option<&str> {
        self.privilege_manager.current().map(|l| l.name.as_str())
    }

    /// Connect and prepare the session for show commands.
    pub async fn open(&mut self) -> Result<(), TransportError> {
        if self.transport.is_some() {
            return Ok(());
        }

        let transport = SshTransport::connect(self.ssh_config.clone()).await?;
        let channel = transport.open_channel().await?;
        self.transport = Some(transport);
        self.channel = Some(PtyChannel::new(channel));

        let (_, prompt) = self.read_prompt(self.timeout).await?;
        debug!("{}: initial prompt {:?}", self.ssh_config.host, prompt);
        self.privilege_manager.observe(&prompt);

        let target = self.platform.default_privilege.clone();
        self.acquire_privilege(&target).await?;

        for command in self.platform.on_open_commands.clone() {
            self.send_command(&command).await.map_err(|e| {
                TransportError::SetupCommandFailed {
                    command: command.clone(),
                    message: e.to_string(),
                }
            })?;
        }

        Ok(())
    }

    /// Send a command and wait for the prompt, using the default timeout.
    pub async fn send_command(&mut self, command: &str) -> Result<Response, ExecutionError> {
        let timeout = self.timeout;
        self.send_command_timeout(command, timeout).await
    }

    /// Send a command and wait for the prompt.
    ///
    /// On timeout the session is resynchronised before returning, so late
    /// output of this command is never read as the output of the next one.
    pub async fn send_command_timeout(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<Response, ExecutionError> {
        // An earlier read was abandoned mid-command
        if self.in_flight {
            self.resync(timeout).await;
        }
        if self.poisoned {
            return Err(ExecutionError::Disconnected);
        }

        let channel = self.channel.as_mut().ok_or(ExecutionError::NotConnected)?;
        let start = Instant::now();

        channel.clear();
        self.in_flight = true;
        channel.send(command).await?;
        let (raw_result, prompt) = match self.read_prompt(timeout).await {
            Ok(read) => read,
            Err(ChannelError::PatternTimeout(waited)) => {
                self.resync(timeout).await;
                return Err(ExecutionError::Timeout(waited));
            }
            Err(e) => return Err(e.into()),
        };
        self.in_flight = false;
        let elapsed = start.elapsed();
        trace!("{:?} -> {} bytes in {:?}", command, raw_result.len(), elapsed);

        self.privilege_manager.observe(&prompt);

        let result = self.platform.normalize_output(&raw_result, command);
        let failure_message = self.platform.detect_failure(&result).map(str::to_string);

        Ok(Response {
            command: command.to_string(),
            result,
            raw_result,
            prompt,
            elapsed,
            failure_message,
        })
    }

    /// Discard output left by a command whose prompt was never read.
    ///
    /// Returns whether the session is usable. A session that cannot get
    /// back to a clean prompt within `limit` is poisoned and reports
    /// itself dead from then on.
    pub async fn resync(&mut self, limit: Duration) -> bool {
        if !self.in_flight || self.poisoned {
            return !self.poisoned;
        }
        let Some(channel) = self.channel.as_mut() else {
            self.poisoned = true;
            return false;
        };

        match channel.resync(&self.prompt_pattern, limit, RESYNC_QUIET).await {
            Ok(()) => {
                self.in_flight = false;
                true
            }
            Err(e) => {
                warn!("{}: session could not be resynchronised: {}", self.ssh_config.host, e);
                self.poisoned = true;
                false
            }
        }
    }

    /// Escalate to `target` along the platform's privilege tree.
    async fn acquire_privilege(&mut self, target: &str) -> Result<(), TransportError> {
        let failed = || TransportError::PrivilegeAcquisitionFailed {
            target: target.to_string(),
        };

        let current = self
            .current_privilege()
            .map(str::to_string)
            .ok_or_else(failed)?;

        let steps: Vec<_> = self
            .privilege_manager
            .escalation_path(&current, target)
            .ok_or_else(failed)?
            .into_iter()
            .cloned()
            .collect();

        for level in steps {
            let command = level.escalate_command.as_deref().ok_or_else(failed)?;
            debug!("{}: escalating to {}", self.ssh_config.host, level.name);
            let secret = self.escalation_secret();

            let channel = self.channel.as_mut().ok_or(TransportError::Disconnected)?;
            channel.send(command).await?;

            if let Some(auth_prompt) = &level.escalate_prompt {
                let either = Regex::new(&format!(
                    "(?:{})|(?:{})",
                    auth_prompt.as_str(),
                    self.prompt_pattern.as_str()
                ))
                .map_err(|_| failed())?;

                let data = channel.read_until(&either, self.timeout).await?;
                if auth_prompt.is_match(last_line(&data)) {
                    let secret = secret.as_ref().ok_or_else(failed)?;
                    channel.send(secret.expose_secret()).await?;
                } else {
                    // Device went straight to the new level
                    let prompt = String::from_utf8_lossy(last_line(&data)).trim().to_string();
                    self.privilege_manager.observe(&prompt);
                    if self.current_privilege() != Some(level.name.as_str()) {
                        return Err(failed());
                    }
                    continue;
                }
            }

            let (_, prompt) = self.read_prompt(self.timeout).await?;
            if self.privilege_manager.observe(&prompt) != Some(level.name.as_str()) {
                return Err(failed());
            }
        }

        Ok(())
    }

    /// Enable secret, falling back to the login password.
    fn escalation_secret(&self) -> Option<SecretString> {
        self.enable_secret.clone().or_else(|| match &self.ssh_config.auth {
            AuthMethod::Password(password) => Some(password.clone()),
            AuthMethod::PrivateKey { .. } => None,
        })
    }

    /// Read until the prompt. Returns the raw text and the prompt line.
    async fn read_prompt(&mut self, timeout: Duration) -> Result<(String, String), ChannelError> {
        let channel = self.channel.as_mut().ok_or(ChannelError::Closed)?;
        let data = channel.read_until(&self.prompt_pattern, timeout).await?;
        let prompt = String::from_utf8_lossy(last_line(&data)).trim().to_string();
        Ok((String::from_utf8_lossy(&data).into_owned(), prompt))
    }

    /// Whether the session can still take commands.
    pub fn is_alive(&self) -> bool {
        !self.poisoned
            && self.transport.as_ref().is_some_and(|t| !t.is_closed())
            && self.channel.as_ref().is_some_and(|c| !c.is_closed())
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Close the shell and the connection. Idempotent.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                trace!("Channel close failed: {}", e);
            }
        }
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }
}

/// Bytes after the last newline, trailing whitespace included.
fn last_line(data: &[u8]) -> &[u8] {
    match memchr::memrchr(b'\n', data) {
        Some(pos) => &data[pos + 1..],
        None => data,
    }
}
