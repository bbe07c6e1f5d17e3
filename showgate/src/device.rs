//! Device target descriptors.
//!
//! A [`DeviceSpec`] is what a request carries. [`DeviceTarget::try_from_spec`]
//! validates it, in order: required fields, length bounds, port range,
//! platform membership. It reports every violated field at once. Secrets
//! move into [`SecretString`] and never show up in `Debug` output or logs.

use std::fmt;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::{DescriptorInvalid, FieldViolation};
use crate::platform::PlatformFamily;
use crate::routing::{RelayHost, RelaySpec};

pub const MAX_HOSTNAME_LEN: usize = 255;
pub const MAX_USERNAME_LEN: usize = 255;
pub const MAX_PASSWORD_LEN: usize = 1024;
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Unvalidated device parameters, as deserialized from a request.
#[derive(Clone, Default, Deserialize)]
pub struct DeviceSpec {
    pub hostname: Option<String>,
    pub port: Option<i64>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "platform")]
    pub os: Option<String>,
    #[serde(alias = "enable_secret")]
    pub enable_password: Option<String>,
    /// Per-device relay override.
    pub jumphost: Option<RelaySpec>,
}

impl DeviceSpec {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        os: impl Into<String>,
    ) -> Self {
        Self {
            hostname: Some(hostname.into()),
            username: Some(username.into()),
            password: Some(password.into()),
            os: Some(os.into()),
            ..Self::default()
        }
    }
}

impl fmt::Debug for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSpec")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("os", &self.os)
            .field(
                "enable_password",
                &self.enable_password.as_ref().map(|_| "[REDACTED]"),
            )
            .field("jumphost", &self.jumphost)
            .finish()
    }
}

/// A validated device. Owned by one execution driver for the life of a request.
#[derive(Debug)]
pub struct DeviceTarget {
    hostname: String,
    port: u16,
    username: String,
    password: SecretString,
    platform: PlatformFamily,
    enable_secret: Option<SecretString>,
    relay: Option<RelayHost>,
}

impl DeviceTarget {
    /// Validate a spec, collecting every violation.
    pub fn try_from_spec(spec: &DeviceSpec) -> Result<Self, DescriptorInvalid> {
        let mut violations = Vec::new();

        let hostname = rules::present("hostname", "Hostname", spec.hostname.as_deref(), &mut violations);
        let username = rules::present("username", "Username", spec.username.as_deref(), &mut violations);
        let password = rules::present("password", "Password", spec.password.as_deref(), &mut violations);
        let os = rules::present("os", "Platform", spec.os.as_deref(), &mut violations);

        if let Some(hostname) = hostname {
            rules::max_len("hostname", "Hostname", hostname, MAX_HOSTNAME_LEN, &mut violations);
        }
        if let Some(username) = username {
            rules::max_len("username", "Username", username, MAX_USERNAME_LEN, &mut violations);
        }
        if let Some(password) = password {
            rules::max_len("password", "Password", password, MAX_PASSWORD_LEN, &mut violations);
        }
        let enable_password = spec.enable_password.as_deref().filter(|s| !s.is_empty());
        if let Some(enable) = enable_password {
            rules::max_len(
                "enable_password",
                "Enable password",
                enable,
                MAX_PASSWORD_LEN,
                &mut violations,
            );
        }

        let port = rules::port("port", spec.port, &mut violations);

        let platform = os.and_then(|os| match PlatformFamily::parse(os) {
            Ok(family) => Some(family),
            Err(rejection) => {
                violations.push(FieldViolation::new("os", rejection.to_string()));
                None
            }
        });

        let relay = match spec.jumphost.as_ref().map(RelaySpec::validate) {
            Some(Ok(relay)) => Some(relay),
            Some(Err(invalid)) => {
                violations.extend(invalid.violations.into_iter().map(|v| v.prefixed("jumphost")));
                None
            }
            None => None,
        };

        match (hostname, username, password, port, platform) {
            (Some(hostname), Some(username), Some(password), Some(port), Some(platform))
                if violations.is_empty() =>
            {
                Ok(Self {
                    hostname: hostname.to_string(),
                    port,
                    username: username.to_string(),
                    password: SecretString::from(password.to_string()),
                    platform,
                    enable_secret: enable_password.map(|s| SecretString::from(s.to_string())),
                    relay,
                })
            }
            _ => Err(DescriptorInvalid::new(violations)),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    pub fn platform(&self) -> PlatformFamily {
        self.platform
    }

    pub fn enable_secret(&self) -> Option<&SecretString> {
        self.enable_secret.as_ref()
    }

    /// Per-device relay override, if any.
    pub fn relay(&self) -> Option<&RelayHost> {
        self.relay.as_ref()
    }
}

/// Field rules shared by device and relay descriptors.
pub(crate) mod rules {
    use super::DEFAULT_SSH_PORT;
    use crate::error::FieldViolation;

    /// Required, non-empty string field.
    pub(crate) fn present<'a>(
        field: &str,
        label: &str,
        value: Option<&'a str>,
        out: &mut Vec<FieldViolation>,
    ) -> Option<&'a str> {
        match value {
            None => {
                out.push(FieldViolation::new(field, format!("{} is required", label)));
                None
            }
            Some(v) if v.trim().is_empty() => {
                out.push(FieldViolation::new(field, format!("{} cannot be empty", label)));
                None
            }
            Some(v) => Some(v),
        }
    }

    pub(crate) fn max_len(
        field: &str,
        label: &str,
        value: &str,
        max: usize,
        out: &mut Vec<FieldViolation>,
    ) {
        if value.chars().count() > max {
            out.push(FieldViolation::new(
                field,
                format!("{} exceeds maximum length of {} characters", label, max),
            ));
        }
    }

    /// Port in 1..=65535, defaulting to 22.
    pub(crate) fn port(field: &str, value: Option<i64>, out: &mut Vec<FieldViolation>) -> Option<u16> {
        match value {
            None => Some(DEFAULT_SSH_PORT),
            Some(p) => match u16::try_from(p) {
                Ok(port) if port != 0 => Some(port),
                _ => {
                    out.push(FieldViolation::new(field, "Port must be between 1 and 65535"));
                    None
                }
            },
        }
    }
}
