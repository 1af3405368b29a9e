//! ServerQuery wire codec.
//!
//! Commands and responses are single lines. Values escape whitespace and
//! separators (`\s` space, `\p` pipe, `\/`, `\\`, C0 controls); list
//! responses separate entries with `|`; every command is answered by data
//! lines followed by a result line `error id=<n> msg=<text>` where `id=0`
//! means success.

use std::collections::HashMap;

use crate::error::QueryError;

/// Result line of a command (`error id=… msg=…`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStatus {
    pub id: u32,
    pub msg: String,
}

impl CommandStatus {
    pub fn is_ok(&self) -> bool {
        self.id == 0
    }
}

/// Escape a value for inclusion in a command line.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            ' ' => out.push_str("\\s"),
            '|' => out.push_str("\\p"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0c' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0b' => out.push_str("\\v"),
            other => out.push(other),
        }
    }
    out
}

/// Reverse [`escape`]. Unknown escape sequences pass the escaped character
/// through unchanged; a trailing lone backslash is kept literally.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('s') => out.push(' '),
            Some('p') => out.push('|'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\x0b'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Parse one entry (`key1=v1 key2=v2 flag`) into a field map. Values are
/// unescaped; flag tokens without `=` map to an empty string.
pub fn parse_fields(entry: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for token in entry.split(' ').filter(|t| !t.is_empty()) {
        match token.split_once('=') {
            Some((key, value)) => fields.insert(key.to_string(), unescape(value)),
            None => fields.insert(token.to_string(), String::new()),
        };
    }
    fields
}

/// Parse a result line. Returns `None` for data lines.
pub fn parse_status_line(line: &str) -> Option<CommandStatus> {
    let rest = line.strip_prefix("error ")?;
    let fields = parse_fields(rest);
    let id = fields.get("id")?.parse::<u32>().ok()?;
    let msg = fields.get("msg").cloned().unwrap_or_default();
    Some(CommandStatus { id, msg })
}

/// Look up a required field and parse it as `u64`.
pub fn field_u64(
    fields: &HashMap<String, String>,
    field: &'static str,
) -> Result<u64, QueryError> {
    let value = fields
        .get(field)
        .ok_or(QueryError::MissingField { field })?;
    value.parse::<u64>().map_err(|_| QueryError::InvalidField {
        field,
        value: value.clone(),
    })
}

/// Look up a required string field.
pub fn field_str<'a>(
    fields: &'a HashMap<String, String>,
    field: &'static str,
) -> Result<&'a str, QueryError> {
    fields
        .get(field)
        .map(String::as_str)
        .ok_or(QueryError::MissingField { field })
}

// ─── Tests ────────────────────────────────────────────────────────
