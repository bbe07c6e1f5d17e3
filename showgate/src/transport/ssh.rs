//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use russh::Channel;
use russh::client::{self, Handle, KeyboardInteractiveAuthResponse, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use secrecy::ExposeSecret;

use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use crate::error::TransportError;

type Result<T> = std::result::Result<T, TransportError>;

/// SSH transport wrapping russh client, optionally tunnelled through a relay.
pub struct SshTransport {
    /// The russh session handle for the target.
    session: Handle<SshHandler>,

    /// Relay session carrying the target's `direct-tcpip` channel.
    jump: Option<Handle<SshHandler>>,

    terminal_width: u32,
    terminal_height: u32,
}

impl SshTransport {
    /// Connect (through the relay, if configured) and authenticate.
    ///
    /// The whole sequence, every hop included, runs under `config.timeout`.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let timeout = config.timeout;
        tokio::time::timeout(timeout, Self::establish(config))
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }

    async fn establish(config: SshConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.timeout),
            ..Default::default()
        });

        let jump = match &config.jump {
            None => None,
            Some(jump) => {
                debug!("Connecting to relay {}:{}", jump.host, jump.port);
                let relay_failed = |e: TransportError| TransportError::Relay {
                    host: jump.host.clone(),
                    message: e.to_string(),
                };

                let (handler, host_key_error) = SshHandler::new(&jump.host, jump.port, &config);
                let mut relay = client::connect(
                    ssh_config.clone(),
                    (jump.host.as_str(), jump.port),
                    handler,
                )
                .await
                .map_err(|e| handshake_error(e, &host_key_error, &jump.host, jump.port))
                .map_err(relay_failed)?;

                authenticate(&mut relay, &jump.username, &jump.auth)
                    .await
                    .map_err(relay_failed)?;

                Some(relay)
            }
        };

        let (handler, host_key_error) = SshHandler::new(&config.host, config.port, &config);
        let handshake = match &jump {
            None => client::connect(ssh_config, (config.host.as_str(), config.port), handler).await,
            Some(relay) => {
                let tunnel = relay
                    .channel_open_direct_tcpip(
                        config.host.clone(),
                        u32::from(config.port),
                        "127.0.0.1",
                        0,
                    )
                    .await
                    .map_err(|e| TransportError::Relay {
                        host: config
                            .jump
                            .as_ref()
                            .map(|j| j.host.clone())
                            .unwrap_or_default(),
                        message: format!("cannot open tunnel to {}: {}", config.socket_addr(), e),
                    })?;
                client::connect_stream(ssh_config, tunnel.into_stream(), handler).await
            }
        };
        let mut session = handshake
            .map_err(|e| handshake_error(e, &host_key_error, &config.host, config.port))?;

        authenticate(&mut session, &config.username, &config.auth).await?;

        Ok(Self {
            session,
            jump,
            terminal_width: config.terminal_width,
            terminal_height: config.terminal_height,
        })
    }

    /// Open a new PTY channel with an interactive shell.
    pub async fn open_channel(&self) -> Result<Channel<Msg>> {
        let channel = self.session.channel_open_session().await?;

        channel
            .request_pty(
                true,
                "xterm",
                self.terminal_width,
                self.terminal_height,
                0,
                0,
                &[],
            )
            .await?;

        channel.request_shell(true).await?;

        Ok(channel)
    }

    /// Whether the target session (or its relay) has gone away.
    pub fn is_closed(&self) -> bool {
        self.session.is_closed() || self.jump.as_ref().is_some_and(Handle::is_closed)
    }

    /// Close the target session, then the relay.
    pub async fn close(self) -> Result<()> {
        let result = self
            .session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await;

        if let Some(jump) = self.jump {
            if let Err(e) = jump
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await
            {
                debug!("Relay disconnect failed: {}", e);
            }
        }

        result.map_err(TransportError::Ssh)
    }
}

/// Prefer the detailed host-key error stored by the handler over russh's
/// generic one, and report socket failures with the address.
fn handshake_error(
    err: russh::Error,
    host_key_error: &Mutex<Option<TransportError>>,
    host: &str,
    port: u16,
) -> TransportError {
    if let Some(hk_err) = host_key_error.lock().ok().and_then(|mut slot| slot.take()) {
        return hk_err;
    }
    match err {
        russh::Error::IO(source) => TransportError::ConnectionFailed {
            host: host.to_string(),
            port,
            source,
        },
        other => TransportError::Ssh(other),
    }
}

/// Authenticate with the server.
///
/// Password logins fall back to keyboard-interactive, which many network
/// devices offer instead of plain password auth.
async fn authenticate(
    session: &mut Handle<SshHandler>,
    username: &str,
    auth: &AuthMethod,
) -> Result<()> {
    let success = match auth {
        AuthMethod::Password(password) => {
            let accepted = session
                .authenticate_password(username, password.expose_secret())
                .await?
                .success();
            if accepted {
                true
            } else {
                keyboard_interactive(session, username, password.expose_secret()).await?
            }
        }
        AuthMethod::PrivateKey { path, passphrase } => {
            let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                .map_err(|e| TransportError::Key(format!("{}: {}", path.display(), e)))?;

            // Get the best RSA hash algorithm supported by the server
            let hash_alg = session.best_supported_rsa_hash().await?.flatten();

            session
                .authenticate_publickey(
                    username,
                    PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                )
                .await?
                .success()
        }
    };

    if !success {
        return Err(TransportError::AuthenticationFailed {
            user: username.to_string(),
        });
    }

    Ok(())
}

/// Answer every keyboard-interactive prompt with the password.
async fn keyboard_interactive(
    session: &mut Handle<SshHandler>,
    username: &str,
    password: &str,
) -> Result<bool> {
    let mut response = session
        .authenticate_keyboard_interactive_start(username, None::<String>)
        .await?;

    // Servers may send an empty info request before the real prompt.
    for _ in 0..3 {
        match response {
            KeyboardInteractiveAuthResponse::Success => return Ok(true),
            KeyboardInteractiveAuthResponse::Failure { .. } => return Ok(false),
            KeyboardInteractiveAuthResponse::InfoRequest { prompts, .. } => {
                let answers = prompts.iter().map(|_| password.to_string()).collect();
                response = session
                    .authenticate_keyboard_interactive_respond(answers)
                    .await?;
            }
        }
    }

    Ok(matches!(response, KeyboardInteractiveAuthResponse::Success))
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    fn new(
        host: &str,
        port: u16,
        config: &SshConfig,
    ) -> (Self, Arc<Mutex<Option<TransportError>>>) {
        let host_key_error = Arc::new(Mutex::new(None));
        let handler = Self {
            host: host.to_string(),
            port,
            host_key_verification: config.host_key_verification,
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };
        (handler, host_key_error)
    }

    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> Result<bool> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> Result<()> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, err: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(err);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key for {}: {}", self.host, e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
