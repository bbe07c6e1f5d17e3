//! Connection routing: direct, or through a relay (jumphost).
//!
//! The router only decides. It opens nothing. A relay always
//! authenticates with a private key reference, never a stored password.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::device::{DeviceTarget, MAX_HOSTNAME_LEN, MAX_USERNAME_LEN, rules};
use crate::error::{DescriptorInvalid, FieldViolation};

/// Unvalidated relay parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RelaySpec {
    #[serde(alias = "hostname")]
    pub host: Option<String>,
    pub port: Option<i64>,
    pub username: Option<String>,
    #[serde(alias = "key")]
    pub key_path: Option<String>,
}

impl RelaySpec {
    /// Validate with the same field rules as a device descriptor.
    pub fn validate(&self) -> Result<RelayHost, DescriptorInvalid> {
        let mut violations = Vec::new();

        let host = rules::present("host", "Jumphost host", self.host.as_deref(), &mut violations);
        let username = rules::present(
            "username",
            "Jumphost username",
            self.username.as_deref(),
            &mut violations,
        );
        let key_path = rules::present(
            "key_path",
            "Jumphost key path",
            self.key_path.as_deref(),
            &mut violations,
        );

        if let Some(host) = host {
            rules::max_len("host", "Jumphost host", host, MAX_HOSTNAME_LEN, &mut violations);
        }
        if let Some(username) = username {
            rules::max_len(
                "username",
                "Jumphost username",
                username,
                MAX_USERNAME_LEN,
                &mut violations,
            );
        }

        let port = rules::port("port", self.port, &mut violations);

        match (host, username, key_path, port) {
            (Some(host), Some(username), Some(key_path), Some(port)) if violations.is_empty() => {
                Ok(RelayHost {
                    host: host.to_string(),
                    port,
                    username: username.to_string(),
                    key_path: PathBuf::from(key_path),
                })
            }
            _ => Err(DescriptorInvalid::new(violations)),
        }
    }
}

/// A validated relay host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayHost {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Private key used to authenticate to the relay.
    pub key_path: PathBuf,
}

/// How one device is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Direct,
    Relayed(RelayHost),
}

impl Route {
    pub fn relay(&self) -> Option<&RelayHost> {
        match self {
            Route::Direct => None,
            Route::Relayed(relay) => Some(relay),
        }
    }

    pub fn is_relayed(&self) -> bool {
        matches!(self, Route::Relayed(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Direct => f.write_str("direct"),
            Route::Relayed(relay) => write!(f, "relay:{}:{}", relay.host, relay.port),
        }
    }
}

/// Chooses a [`Route`] per device.
///
/// Precedence: device override, then request-level relay, then (when the
/// request asks for one) the process-wide default. Otherwise direct.
#[derive(Debug, Clone, Copy)]
pub struct Router<'a> {
    default_relay: Option<&'a RelayHost>,
}

impl<'a> Router<'a> {
    pub fn new(default_relay: Option<&'a RelayHost>) -> Self {
        Self { default_relay }
    }

    pub fn route(
        &self,
        target: &DeviceTarget,
        request_relay: Option<&RelayHost>,
        use_relay: bool,
    ) -> Result<Route, FieldViolation> {
        if let Some(relay) = target.relay() {
            return Ok(Route::Relayed(relay.clone()));
        }
        if let Some(relay) = request_relay {
            return Ok(Route::Relayed(relay.clone()));
        }
        if use_relay {
            return self
                .default_relay
                .map(|relay| Route::Relayed(relay.clone()))
                .ok_or_else(|| {
                    FieldViolation::new(
                        "use_jumphost",
                        "a jumphost was requested but none is configured",
                    )
                });
        }
        Ok(Route::Direct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceSpec;

    fn relay(host: &str) -> RelayHost {
        RelayHost {
            host: host.to_string(),
            port: 22,
            username: "jump".to_string(),
            key_path: PathBuf::from("/keys/id_ed25519"),
        }
    }

    fn relay_spec(host: &str) -> RelaySpec {
        RelaySpec {
            host: Some(host.to_string()),
            port: None,
            username: Some("jump".to_string()),
            key_path: Some("/keys/id_ed25519".to_string()),
        }
    }

    fn target(override_relay: Option<RelaySpec>) -> DeviceTarget {
        let mut spec = DeviceSpec::new("10.0.0.1", "admin", "x", "iosxe");
        spec.jumphost = override_relay;
        DeviceTarget::try_from_spec(&spec).unwrap()
    }

    #[test]
    fn test_direct_by_default() {
        let default = relay("default");
        let router = Router::new(Some(&default));
        assert_eq!(router.route(&target(None), None, false), Ok(Route::Direct));
    }

    #[test]
    fn test_default_used_when_requested() {
        let default = relay("default");
        let router = Router::new(Some(&default));
        assert_eq!(
            router.route(&target(None), None, true),
            Ok(Route::Relayed(default.clone()))
        );
    }

    #[test]
    fn test_request_relay_beats_default() {
        let default = relay("default");
        let request = relay("request");
        let router = Router::new(Some(&default));
        assert_eq!(
            router.route(&target(None), Some(&request), true),
            Ok(Route::Relayed(request.clone()))
        );
    }

    #[test]
    fn test_device_override_wins() {
        let default = relay("default");
        let request = relay("request");
        let router = Router::new(Some(&default));
        let route = router
            .route(&target(Some(relay_spec("device"))), Some(&request), true)
            .unwrap();
        assert_eq!(route.relay().map(|r| r.host.as_str()), Some("device"));
        assert_eq!(route.to_string(), "relay:device:22");
    }

    #[test]
    fn test_requested_but_unconfigured() {
        let router = Router::new(None);
        let err = router.route(&target(None), None, true).unwrap_err();
        assert_eq!(err.field, "use_jumphost");
    }

    #[test]
    fn test_relay_spec_validation() {
        let spec = RelaySpec {
            host: Some(String::new()),
            port: Some(99999),
            username: None,
            key_path: Some("/keys/id_rsa".to_string()),
        };
        let err = spec.validate().unwrap_err();
        assert_eq!(err.violations.len(), 3);
        assert!(err.mentions("host"));
        assert!(err.mentions("username"));
        assert!(err.mentions("port"));

        let ok = relay_spec("bastion").validate().unwrap();
        assert_eq!(ok.port, 22);
        assert_eq!(ok.key_path, PathBuf::from("/keys/id_ed25519"));
    }
}
