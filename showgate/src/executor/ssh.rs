//! Production connector: SSH CLI sessions through [`GenericDriver`].

use std::path::PathBuf;
use std::time::Duration;

use log::{debug, warn};

use super::{Connector, Session};
use crate::config::ServiceConfig;
use crate::device::DeviceTarget;
use crate::driver::{DriverBuilder, GenericDriver};
use crate::error::{ExecutionError, TransportError};
use crate::routing::Route;
use crate::transport::HostKeyVerification;

/// Opens interactive SSH sessions, directly or through a relay.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl SshConnector {
    pub fn new(host_key_verification: HostKeyVerification, known_hosts_path: Option<PathBuf>) -> Self {
        Self {
            host_key_verification,
            known_hosts_path,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.host_key_verification, config.known_hosts_path.clone())
    }
}

impl Connector for SshConnector {
    type Session = CliSession;

    async fn open_session(
        &self,
        target: &DeviceTarget,
        route: &Route,
        timeout: Duration,
    ) -> Result<CliSession, TransportError> {
        let mut builder = DriverBuilder::new(
            target.hostname(),
            target.username(),
            target.platform().definition(),
        )
        .port(target.port())
        .password(target.password().clone())
        .enable_secret(target.enable_secret().cloned())
        .timeout(timeout)
        .host_key_verification(self.host_key_verification)
        .known_hosts_path(self.known_hosts_path.clone());

        if let Some(relay) = route.relay() {
            builder = builder.jump_host(
                relay.host.clone(),
                relay.port,
                relay.username.clone(),
                relay.key_path.clone(),
            );
        }

        let mut driver = builder.build();
        if let Err(e) = driver.open().await {
            // Release whatever part of the session was set up
            if let Err(close_err) = driver.close().await {
                debug!("{}: close after failed open: {}", target.hostname(), close_err);
            }
            return Err(e);
        }

        Ok(CliSession {
            hostname: target.hostname().to_string(),
            driver,
        })
    }
}

/// An open CLI session at the platform's show-command privilege level.
pub struct CliSession {
    hostname: String,
    driver: GenericDriver,
}

impl Session for CliSession {
    async fn execute(&mut self, command: &str, timeout: Duration) -> Result<String, ExecutionError> {
        self.driver
            .send_command_timeout(command, timeout)
            .await?
            .into_result()
    }

    async fn recover(&mut self, timeout: Duration) {
        if !self.driver.resync(timeout).await {
            warn!("{}: session lost after command timeout", self.hostname);
        }
    }

    fn is_alive(&self) -> bool {
        self.driver.is_alive()
    }

    async fn close(mut self) {
        if let Err(e) = self.driver.close().await {
            warn!("{}: error while closing session: {}", self.hostname, e);
        }
    }
}
