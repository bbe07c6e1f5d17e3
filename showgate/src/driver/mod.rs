//! High-level driver for device interaction.
//!
//! The driver layer owns one interactive CLI session: it connects, reaches
//! the privilege level show commands run from, and sends commands with
//! prompt detection and failure-pattern checks.

mod builder;
mod generic;
mod privilege;
mod response;

pub use builder::DriverBuilder;
pub use generic::GenericDriver;
pub use privilege::PrivilegeManager;
pub use response::Response;
