//! Builder for creating device drivers.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::generic::GenericDriver;
use crate::platform::PlatformDefinition;
use crate::transport::{AuthMethod, HostKeyVerification, ProxyJump, SshConfig};

/// Builder for constructing device drivers.
///
/// # Example
///
/// ```rust,no_run
/// use secrecy::SecretString;
/// use showgate::driver::DriverBuilder;
/// use showgate::platform::PlatformFamily;
///
/// # async fn example() -> Result<(), showgate::error::TransportError> {
/// let mut driver = DriverBuilder::new("192.168.1.1", "admin", PlatformFamily::Iosxe.definition())
///     .password(SecretString::from("secret".to_string()))
///     .build();
/// driver.open().await?;
/// let response = driver.send_command("show version").await;
/// driver.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder {
    host: String,
    port: u16,
    username: String,
    auth: Option<AuthMethod>,
    enable_secret: Option<SecretString>,
    platform: PlatformDefinition,
    timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    jump: Option<ProxyJump>,
}

impl DriverBuilder {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        platform: PlatformDefinition,
    ) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            auth: None,
            enable_secret: None,
            platform,
            timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            jump: None,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: SecretString) -> Self {
        self.auth = Some(AuthMethod::Password(password));
        self
    }

    /// Secret for the `enable` prompt. Defaults to the login password.
    pub fn enable_secret(mut self, secret: Option<SecretString>) -> Self {
        self.enable_secret = secret;
        self
    }

    /// Connect and per-read timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    pub fn known_hosts_path(mut self, path: Option<PathBuf>) -> Self {
        self.known_hosts_path = path;
        self
    }

    /// Tunnel through a relay host, authenticating to it with a private key.
    pub fn jump_host(
        mut self,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        key_path: impl Into<PathBuf>,
    ) -> Self {
        self.jump = Some(ProxyJump {
            host: host.into(),
            port,
            username: username.into(),
            auth: AuthMethod::PrivateKey {
                path: key_path.into(),
                passphrase: None,
            },
        });
        self
    }

    /// Build the driver.
    ///
    /// This creates the driver but does not connect. Call `open()` on the
    /// returned driver to establish the connection.
    pub fn build(self) -> GenericDriver {
        let ssh_config = SshConfig {
            host: self.host,
            port: self.port,
            username: self.username,
            auth: self
                .auth
                .unwrap_or_else(|| AuthMethod::Password(SecretString::from(String::new()))),
            timeout: self.timeout,
            terminal_width: self.platform.terminal_width,
            terminal_height: self.platform.terminal_height,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
            jump: self.jump,
        };

        GenericDriver::new(ssh_config, self.platform, self.enable_secret)
    }
}
