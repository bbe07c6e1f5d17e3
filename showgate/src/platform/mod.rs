//! Platform definitions for the supported CLI dialects.
//!
//! [`PlatformFamily`] is the closed set of dialects a request may name.
//! Each family resolves to its filter syntax and to a
//! [`PlatformDefinition`] describing prompts, privilege levels and
//! failure strings.

mod definition;
mod family;
mod privilege_level;
pub mod vendors;

pub use definition::PlatformDefinition;
pub use family::{FilterSyntax, JUNOS_UNSUPPORTED, PlatformFamily, PlatformRejection};
pub use privilege_level::PrivilegeLevel;
