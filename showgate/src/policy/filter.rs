//! Output filter clauses (`| include <pattern>` and friends).

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::platform::PlatformFamily;

/// Filter operator applied to command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    Include,
    Exclude,
    Begin,
    Section,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 4] = [
        FilterOperator::Include,
        FilterOperator::Exclude,
        FilterOperator::Begin,
        FilterOperator::Section,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Include => "include",
            FilterOperator::Exclude => "exclude",
            FilterOperator::Begin => "begin",
            FilterOperator::Section => "section",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FilterOperator::Include => "Show only lines containing the pattern",
            FilterOperator::Exclude => "Show lines NOT containing the pattern",
            FilterOperator::Begin => "Show output starting from the pattern",
            FilterOperator::Section => "Show the section containing the pattern",
        }
    }

    /// Human-readable listing of operators with an example.
    pub fn catalog() -> String {
        let mut out = String::from("Available filter operators:\n");
        for op in Self::ALL {
            out.push_str(&format!("  {:<8} {}\n", op.as_str(), op.description()));
        }
        out.push_str(
            "\nExample: command \"show running-config\", pipe_option \"include\", \
             pipe_value \"interface\"\n  => show running-config | include interface\n",
        );
        out
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == lowered)
            .ok_or_else(|| format!("unknown filter operator '{}'", s))
    }
}

/// A validated filter: operator plus non-empty pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub operator: FilterOperator,
    pub pattern: String,
}

impl FilterClause {
    /// Render the filter suffix for a family, e.g. `| include up`.
    ///
    /// Returns `None` if the family has no such operator.
    pub fn render(&self, family: PlatformFamily) -> Option<String> {
        let syntax = family.filter_syntax();
        syntax
            .keyword(self.operator)
            .map(|keyword| format!("{} {} {}", syntax.separator, keyword, self.pattern))
    }

    /// Split a composed command back into its base command and filter clause.
    pub fn split(composed: &str, family: PlatformFamily) -> Option<(&str, FilterClause)> {
        let syntax = family.filter_syntax();
        let separator = format!(" {} ", syntax.separator);
        let (command, clause) = composed.split_once(separator.as_str())?;
        let (keyword, pattern) = clause.split_once(' ')?;
        let operator = syntax.operator(keyword)?;
        Some((
            command,
            FilterClause {
                operator,
                pattern: pattern.to_string(),
            },
        ))
    }
}
