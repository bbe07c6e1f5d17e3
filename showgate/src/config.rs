//! Process-wide configuration, read once at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

use crate::error::{ConfigError, FieldViolation};
use crate::routing::{RelayHost, RelaySpec};
use crate::transport::HostKeyVerification;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Immutable service settings shared by every request.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Default relay, used when a request sets `use_jumphost`.
    pub relay: Option<RelayHost>,

    /// Connect and per-command timeout when the request gives none.
    pub default_timeout: Duration,

    /// Ceiling applied to request timeouts.
    pub max_timeout: Duration,

    /// Devices contacted at once within one request.
    pub max_concurrency: usize,

    pub host_key_verification: HostKeyVerification,

    /// known_hosts file; `~/.ssh/known_hosts` when unset.
    pub known_hosts_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            relay: None,
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_timeout: Duration::from_secs(MAX_TIMEOUT_SECS),
            max_concurrency: 1,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }
}

impl ServiceConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    ///
    /// Unset and empty variables fall back to defaults. A relay is configured
    /// only when `JUMPHOST_HOST` is set, and then `JUMPHOST_USERNAME` and
    /// `JUMPHOST_KEY_PATH` become mandatory.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let relay = match get("JUMPHOST_HOST") {
            None => None,
            Some(host) => {
                let username = get("JUMPHOST_USERNAME").ok_or(ConfigError::MissingVar {
                    name: "JUMPHOST_USERNAME",
                })?;
                let key_path = get("JUMPHOST_KEY_PATH").ok_or(ConfigError::MissingVar {
                    name: "JUMPHOST_KEY_PATH",
                })?;
                let port = get("JUMPHOST_PORT")
                    .map(|v| parse_var::<i64>("JUMPHOST_PORT", &v))
                    .transpose()?;
                let spec = RelaySpec {
                    host: Some(host),
                    port,
                    username: Some(username),
                    key_path: Some(key_path),
                };
                Some(spec.validate().map_err(ConfigError::InvalidRelay)?)
            }
        };

        let default_timeout = match get("SHOWGATE_DEFAULT_TIMEOUT") {
            Some(v) => seconds("SHOWGATE_DEFAULT_TIMEOUT", &v)?,
            None => defaults.default_timeout,
        };
        let max_timeout = match get("SHOWGATE_MAX_TIMEOUT") {
            Some(v) => seconds("SHOWGATE_MAX_TIMEOUT", &v)?,
            None => defaults.max_timeout,
        };
        if default_timeout > max_timeout {
            return Err(ConfigError::InvalidValue {
                name: "SHOWGATE_DEFAULT_TIMEOUT",
                value: default_timeout.as_secs().to_string(),
                message: format!("exceeds SHOWGATE_MAX_TIMEOUT ({}s)", max_timeout.as_secs()),
            });
        }

        let max_concurrency = match get("SHOWGATE_MAX_CONCURRENCY") {
            Some(v) => match parse_var::<usize>("SHOWGATE_MAX_CONCURRENCY", &v)? {
                0 => {
                    return Err(ConfigError::InvalidValue {
                        name: "SHOWGATE_MAX_CONCURRENCY",
                        value: v,
                        message: "must be at least 1".to_string(),
                    });
                }
                n => n,
            },
            None => defaults.max_concurrency,
        };

        let host_key_verification = match get("SHOWGATE_HOST_KEY_CHECKING") {
            Some(v) => parse_var("SHOWGATE_HOST_KEY_CHECKING", &v)?,
            None => defaults.host_key_verification,
        };

        Ok(Self {
            relay,
            default_timeout,
            max_timeout,
            max_concurrency,
            host_key_verification,
            known_hosts_path: get("SHOWGATE_KNOWN_HOSTS").map(PathBuf::from),
        })
    }

    /// Timeout for one request: the requested seconds, or the default,
    /// clamped to `max_timeout`.
    pub fn effective_timeout(&self, requested: Option<u64>) -> Result<Duration, FieldViolation> {
        match requested {
            None => Ok(self.default_timeout),
            Some(0) => Err(FieldViolation::new(
                "timeout",
                "Timeout must be at least 1 second",
            )),
            Some(secs) => {
                let requested = Duration::from_secs(secs);
                if requested > self.max_timeout {
                    warn!(
                        "Requested timeout {}s exceeds ceiling, using {}s",
                        secs,
                        self.max_timeout.as_secs()
                    );
                    Ok(self.max_timeout)
                } else {
                    Ok(requested)
                }
            }
        }
    }
}

fn parse_var<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            message: e.to_string(),
        })
}

fn seconds(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match parse_var::<u64>(name, value)? {
        0 => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            message: "must be at least 1 second".to_string(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}
