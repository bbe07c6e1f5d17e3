//! # Showgate
//!
//! Validated, read-only show-command execution across network devices.
//!
//! A request names devices and show commands. Every command is checked
//! against a read-only policy, every device descriptor and relay route is
//! validated, and only then are devices contacted over SSH. Each device runs
//! the full command list in order and the results come back per device and
//! per command, with optional TextFSM-structured output.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use showgate::{Orchestrator, ServiceConfig, ShowRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::from_env()?;
//!     let request: ShowRequest = serde_json::from_str(r#"{
//!         "devices": [{"hostname": "10.0.0.1", "username": "admin",
//!                      "password": "secret", "os": "iosxe"}],
//!         "commands": ["show version"]
//!     }"#)?;
//!
//!     let batch = Orchestrator::ssh(&config)
//!         .execute(&request, &CancellationToken::new())
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&batch)?);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod channel;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod executor;
pub mod parse;
pub mod platform;
pub mod policy;
pub mod result;
pub mod routing;
pub mod transport;

// Re-export main types for convenience
pub use batch::{Orchestrator, PreparedBatch, ShowRequest};
pub use config::ServiceConfig;
pub use device::{DeviceSpec, DeviceTarget};
pub use error::{Error, Result};
pub use executor::{Connector, DeviceExecutor, OutputMode, Session, SshConnector};
pub use parse::{OutputParser, TextFsmParser};
pub use platform::PlatformFamily;
pub use policy::{CommandEntry, FilterOperator, ValidatedCommand};
pub use result::{BatchResult, CommandResult, DeviceResult};
pub use routing::{RelayHost, RelaySpec, Route};
