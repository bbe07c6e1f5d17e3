//! TextFSM-backed output parser.

use std::borrow::Cow;

use serde_json::Value;
use textfsm_rust::Template;

use super::OutputParser;
use crate::error::ParseError;
use crate::platform::PlatformFamily;

/// One template and the commands it applies to.
#[derive(Debug, Clone)]
struct TemplateEntry {
    name: Cow<'static, str>,
    families: Vec<PlatformFamily>,
    command: String,
    source: Cow<'static, str>,
}

/// Parses command output with TextFSM templates looked up by
/// platform family and command.
#[derive(Debug, Clone)]
pub struct TextFsmParser {
    templates: Vec<TemplateEntry>,
}

impl TextFsmParser {
    /// Parser with no templates.
    pub fn empty() -> Self {
        Self { templates: vec![] }
    }

    /// Parser with the built-in templates.
    pub fn new() -> Self {
        let ios = [PlatformFamily::Ios, PlatformFamily::Iosxe];
        Self::empty()
            .with_builtin(
                "cisco_ios_show_version",
                &ios,
                "show version",
                include_str!("templates/cisco_ios_show_version.textfsm"),
            )
            .with_builtin(
                "cisco_ios_show_ip_interface_brief",
                &ios,
                "show ip interface brief",
                include_str!("templates/cisco_ios_show_ip_interface_brief.textfsm"),
            )
            .with_builtin(
                "cisco_nxos_show_version",
                &[PlatformFamily::Nxos],
                "show version",
                include_str!("templates/cisco_nxos_show_version.textfsm"),
            )
    }

    fn with_builtin(
        mut self,
        name: &'static str,
        families: &[PlatformFamily],
        command: &str,
        source: &'static str,
    ) -> Self {
        self.templates.push(TemplateEntry {
            name: Cow::Borrowed(name),
            families: families.to_vec(),
            command: normalize_command(command),
            source: Cow::Borrowed(source),
        });
        self
    }

    /// Register a template. Later registrations win over earlier ones.
    pub fn with_template(
        mut self,
        name: impl Into<String>,
        family: PlatformFamily,
        command: &str,
        source: impl Into<String>,
    ) -> Self {
        self.templates.push(TemplateEntry {
            name: Cow::Owned(name.into()),
            families: vec![family],
            command: normalize_command(command),
            source: Cow::Owned(source.into()),
        });
        self
    }

    /// Whether a template exists for the pair.
    pub fn supports(&self, platform: PlatformFamily, command: &str) -> bool {
        self.lookup(platform, command).is_some()
    }

    fn lookup(&self, platform: PlatformFamily, command: &str) -> Option<&TemplateEntry> {
        let command = normalize_command(command);
        self.templates
            .iter()
            .rev()
            .find(|t| t.command == command && t.families.contains(&platform))
    }
}

impl Default for TextFsmParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputParser for TextFsmParser {
    fn parse(&self, raw: &str, platform: PlatformFamily, command: &str) -> Result<Value, ParseError> {
        let entry = self
            .lookup(platform, command)
            .ok_or_else(|| ParseError::NoTemplate {
                platform: platform.to_string(),
                command: command.to_string(),
            })?;

        let template = Template::parse_str(&entry.source).map_err(|e| ParseError::Template {
            template: entry.name.to_string(),
            message: e.to_string(),
        })?;

        let mut parser = template.parser();
        let records = parser
            .parse_text_to_dicts(raw)
            .map_err(|e| ParseError::Output(e.to_string()))?;

        if records.is_empty() {
            return Err(ParseError::Output(format!(
                "template '{}' matched no records",
                entry.name
            )));
        }

        serde_json::to_value(records).map_err(|e| ParseError::Output(e.to_string()))
    }
}

/// Lowercase, single-spaced.
fn normalize_command(command: &str) -> String {
    command
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const IOS_VERSION: &str = "\
Cisco IOS Software, C2900 Software (C2900-UNIVERSALK9-M), Version 15.2(4)M3, RELEASE SOFTWARE (fc1)
Technical Support: http://www.cisco.com/techsupport
ROM: System Bootstrap, Version 15.0(1r)M15, RELEASE SOFTWARE (fc1)

edge-rtr-01 uptime is 2 weeks, 3 days, 4 hours, 5 minutes
System returned to ROM by power-on
";

    const IP_BRIEF: &str = "\
Interface              IP-Address      OK? Method Status                Protocol
GigabitEthernet0/0     10.0.0.1        YES NVRAM  up                    up
GigabitEthernet0/1     unassigned      YES unset  administratively down down
Loopback0              192.0.2.1       YES manual up                    up
";

    fn values(record: &Value) -> Vec<String> {
        record
            .as_object()
            .map(|o| o.values().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_ios_show_version() {
        let parsed = TextFsmParser::new()
            .parse(IOS_VERSION, PlatformFamily::Iosxe, "show version")
            .unwrap();
        let records = parsed.as_array().unwrap();
        assert_eq!(records.len(), 1);
        let values = values(&records[0]);
        assert!(values.contains(&"15.2(4)M3".to_string()));
        assert!(values.contains(&"edge-rtr-01".to_string()));
    }

    #[test]
    fn test_ip_interface_brief() {
        let parsed = TextFsmParser::new()
            .parse(IP_BRIEF, PlatformFamily::Ios, "show  IP interface brief")
            .unwrap();
        let records = parsed.as_array().unwrap();
        assert_eq!(records.len(), 3);
        assert!(values(&records[1]).contains(&"administratively down".to_string()));
    }

    #[test]
    fn test_no_template() {
        let err = TextFsmParser::new()
            .parse("", PlatformFamily::Asa, "show version")
            .unwrap_err();
        assert!(matches!(err, ParseError::NoTemplate { .. }));
    }

    #[test]
    fn test_no_records_is_an_error() {
        let err = TextFsmParser::new()
            .parse("nothing useful", PlatformFamily::Nxos, "show version")
            .unwrap_err();
        assert!(matches!(err, ParseError::Output(_)));
    }

    #[test]
    fn test_custom_template_overrides() {
        let parser = TextFsmParser::new().with_template(
            "clock",
            PlatformFamily::Asa,
            "show clock",
            "Value TIME (\\S+)\n\nStart\n  ^${TIME}\\s+UTC -> Record\n",
        );
        assert!(parser.supports(PlatformFamily::Asa, "show clock"));
        assert!(!parser.supports(PlatformFamily::Ios, "show clock"));

        let parsed = parser
            .parse("10:15:01.123 UTC Mon Mar 3 2025", PlatformFamily::Asa, "show clock")
            .unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(1));
    }
}
