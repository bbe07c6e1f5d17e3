//! The closed set of supported platform families.
//!
//! Each family resolves, through static tables, to its output filter syntax
//! and to a full [`PlatformDefinition`] used by the SSH driver.

use std::fmt;

use serde::Serialize;

use super::definition::PlatformDefinition;
use super::vendors;
use crate::policy::FilterOperator;

/// Rejection message for JunOS. Kept stable: callers match on it.
pub const JUNOS_UNSUPPORTED: &str = "JunOS is not supported: its output filter syntax \
     (| match / | except) is incompatible with the include/exclude/begin/section \
     filters used by this service";

/// Device CLI dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    Ios,
    Iosxe,
    Iosxr,
    Nxos,
    Asa,
}

/// Output filter spelling for one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSyntax {
    /// Token that separates the command from the filter.
    pub separator: &'static str,
    pub include: &'static str,
    pub exclude: &'static str,
    pub begin: &'static str,
    /// `None` when the family has no section filter.
    pub section: Option<&'static str>,
}

const CISCO_FILTERS: FilterSyntax = FilterSyntax {
    separator: "|",
    include: "include",
    exclude: "exclude",
    begin: "begin",
    section: Some("section"),
};

const ASA_FILTERS: FilterSyntax = FilterSyntax {
    separator: "|",
    include: "include",
    exclude: "exclude",
    begin: "begin",
    section: None,
};

impl FilterSyntax {
    /// Keyword for an operator, or `None` if the family lacks it.
    pub fn keyword(&self, operator: FilterOperator) -> Option<&'static str> {
        match operator {
            FilterOperator::Include => Some(self.include),
            FilterOperator::Exclude => Some(self.exclude),
            FilterOperator::Begin => Some(self.begin),
            FilterOperator::Section => self.section,
        }
    }

    /// Reverse lookup of [`keyword`](Self::keyword).
    pub fn operator(&self, keyword: &str) -> Option<FilterOperator> {
        FilterOperator::ALL
            .iter()
            .copied()
            .find(|op| self.keyword(*op) == Some(keyword))
    }
}

/// Why a platform string was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformRejection {
    /// A known family that will never be supported.
    Excluded(&'static str),
    /// Anything else.
    Unknown(String),
}

impl fmt::Display for PlatformRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformRejection::Excluded(message) => f.write_str(message),
            PlatformRejection::Unknown(value) => write!(
                f,
                "unsupported platform '{}'; expected one of: {}",
                value,
                PlatformFamily::ALL
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

impl PlatformFamily {
    /// Every supported family, in catalog order.
    pub const ALL: [PlatformFamily; 5] = [
        PlatformFamily::Ios,
        PlatformFamily::Iosxe,
        PlatformFamily::Iosxr,
        PlatformFamily::Nxos,
        PlatformFamily::Asa,
    ];

    /// Parse a platform tag, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, PlatformRejection> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "ios" => Ok(PlatformFamily::Ios),
            "iosxe" | "ios-xe" => Ok(PlatformFamily::Iosxe),
            "iosxr" | "ios-xr" => Ok(PlatformFamily::Iosxr),
            "nxos" | "nx-os" => Ok(PlatformFamily::Nxos),
            "asa" => Ok(PlatformFamily::Asa),
            "junos" | "juniper" | "juniper_junos" => {
                Err(PlatformRejection::Excluded(JUNOS_UNSUPPORTED))
            }
            _ => Err(PlatformRejection::Unknown(value.to_string())),
        }
    }

    /// The canonical request tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformFamily::Ios => "ios",
            PlatformFamily::Iosxe => "iosxe",
            PlatformFamily::Iosxr => "iosxr",
            PlatformFamily::Nxos => "nxos",
            PlatformFamily::Asa => "asa",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlatformFamily::Ios => "Cisco IOS",
            PlatformFamily::Iosxe => "Cisco IOS-XE",
            PlatformFamily::Iosxr => "Cisco IOS-XR",
            PlatformFamily::Nxos => "Cisco NX-OS",
            PlatformFamily::Asa => "Cisco ASA",
        }
    }

    pub fn filter_syntax(&self) -> &'static FilterSyntax {
        match self {
            PlatformFamily::Asa => &ASA_FILTERS,
            _ => &CISCO_FILTERS,
        }
    }

    /// Prompt, privilege and failure-pattern definition for the SSH driver.
    pub fn definition(&self) -> PlatformDefinition {
        match self {
            PlatformFamily::Ios => vendors::cisco_ios::platform("cisco_ios"),
            PlatformFamily::Iosxe => vendors::cisco_ios::platform("cisco_iosxe"),
            PlatformFamily::Iosxr => vendors::cisco_iosxr::platform(),
            PlatformFamily::Nxos => vendors::cisco_nxos::platform(),
            PlatformFamily::Asa => vendors::cisco_asa::platform(),
        }
    }

    /// Human-readable listing of supported families.
    pub fn catalog() -> String {
        let mut out = String::from("Supported platforms:\n");
        for family in Self::ALL {
            out.push_str(&format!(
                "  {:<8} {}\n",
                family.as_str(),
                family.display_name()
            ));
        }
        out.push_str("\nJunOS is not supported due to incompatible filter syntax.\n");
        out
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
