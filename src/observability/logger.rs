//! Structured JSON logger
//!
//! - One log line = one event
//! - Deterministic key ordering
//! - Explicit severity levels
//! - Synchronous, no buffering
//!
//! Pipeline stages log through this module so that a write's lifecycle
//! (start, commit, conflict, tombstone) is reconstructible from output alone.

use std::fmt;
use std::io::{self, Write};

use serde_json::{Map, Value};

/// Log severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues, caller-resolvable conflicts
    Warn = 2,
    /// Operation failures
    Error = 3,
}

impl Severity {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured logger that writes one JSON object per line.
///
/// Keys are emitted in sorted order, so identical events always produce
/// identical lines.
pub struct Logger;

impl Logger {
    /// Log an event with the given severity and fields to stdout.
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        Self::log_to_writer(severity, event, fields, &mut io::stdout());
    }

    /// Log to stderr (for errors).
    pub fn log_stderr(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        Self::log_to_writer(severity, event, fields, &mut io::stderr());
    }

    /// Internal log implementation that writes to a given writer.
    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        // serde_json's default Map is a BTreeMap, which gives the sorted
        // key order the format requires.
        let mut object = Map::new();
        object.insert("event".to_string(), Value::String(event.to_string()));
        object.insert(
            "severity".to_string(),
            Value::String(severity.as_str().to_string()),
        );
        for (key, value) in fields {
            object.insert((*key).to_string(), Value::String((*value).to_string()));
        }

        let mut line = Value::Object(object).to_string();
        line.push('\n');

        // One write_all per line keeps events whole under interleaving.
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut buffer = Vec::new();
        Logger::log_to_writer(severity, event, fields, &mut buffer);
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_one_line_per_event() {
        let line = render(Severity::Info, "write_commit", &[("entity", "user/abc")]);
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_line_is_valid_json_with_sorted_keys() {
        let line = render(
            Severity::Info,
            "write_commit",
            &[("stamp", "12"), ("collection", "users")],
        );
        let parsed: serde_json::Value = serde_json::from_str(line.trim()).unwrap();

        assert_eq!(parsed["event"], "write_commit");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["collection"], "users");

        let collection_at = line.find("collection").unwrap();
        let stamp_at = line.find("stamp").unwrap();
        assert!(collection_at < stamp_at);
    }

    #[test]
    fn test_identical_events_render_identically() {
        let a = render(Severity::Warn, "version_conflict", &[("b", "2"), ("a", "1")]);
        let b = render(Severity::Warn, "version_conflict", &[("a", "1"), ("b", "2")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let line = render(Severity::Error, "storage_failure", &[("detail", "a\"b\nc")]);
        let parsed: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(parsed["detail"], "a\"b\nc");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
    }
}
