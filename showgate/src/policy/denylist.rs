//! Static denylists. Read-only for the life of the process.

use std::sync::LazyLock;

use regex::Regex;

/// Shell/CLI metacharacters that may not appear in a command.
///
/// Multi-character tokens come first so the longest token at a position is reported.
pub const COMMAND_TOKENS: &[&str] = &[
    "&&", "||", "$(", "${", ">>", "<<", ";", "|", "&", "`", "$", ">", "<", "\n", "\r", "\\",
    "\0",
];

/// Narrower set for filter patterns: enough to stop chaining through the filter clause.
pub const FILTER_TOKENS: &[&str] = &[";", "|", "&", "`", "$", ">", "<", "\n", "\r", "\0"];

/// State-changing keywords, matched as whole words anywhere in the command.
pub const STATE_CHANGING_KEYWORDS: &[&str] = &[
    "configure", "conf", "write", "reload", "reset", "delete", "erase", "format", "copy",
    "clear", "debug", "undebug", "shutdown", "squeeze", "zeroize",
];

/// Commands must start with this verb.
pub static READ_ONLY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*show(?:\s|$)").unwrap());

static KEYWORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives = STATE_CHANGING_KEYWORDS.join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives)).unwrap()
});

/// Earliest denylisted token in `text`, with its character offset.
pub fn find_token(text: &str, tokens: &[&'static str]) -> Option<(&'static str, usize)> {
    for (position, (byte_offset, _)) in text.char_indices().enumerate() {
        let rest = &text[byte_offset..];
        if let Some(token) = tokens.iter().find(|token| rest.starts_with(**token)) {
            return Some((token, position));
        }
    }
    None
}

/// Earliest state-changing keyword in `text`, as written, with its character offset.
pub fn find_keyword(text: &str) -> Option<(&str, usize)> {
    KEYWORD_PATTERN
        .find(text)
        .map(|m| (m.as_str(), text[..m.start()].chars().count()))
}
