//! SSH transport layer wrapping russh.
//!
//! This module provides the low-level SSH connection management:
//! connection setup through an optional relay, authentication, host key
//! checking, and channel creation.

pub mod config;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, ProxyJump, SshConfig};
pub use ssh::SshTransport;
