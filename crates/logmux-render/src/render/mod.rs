//! Turning entries into output text
//!
//! Rendering never modifies the record: the long and short layouts are
//! assembled into fresh buffers from a read-only view of the fields.

mod http;
mod js;
mod layout;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use logmux_types::{LogLevel, PendingEntry, Record};

use crate::config::{OutputMode, RenderConfig};
use layout::Layout;

/// Render one kept entry. Lines that are not records are returned as-is.
pub fn render_entry(entry: &PendingEntry, config: &RenderConfig) -> String {
    match &entry.record {
        Some(record) => render_record(record, config),
        None => format!("{}\n", entry.line),
    }
}

/// Render a record in the configured mode, newline-terminated
pub fn render_record(record: &Record, config: &RenderConfig) -> String {
    match config.mode {
        OutputMode::Long => Layout::build(record, config, false).render(),
        OutputMode::Short => Layout::build(record, config, true).render(),
        OutputMode::Simple => {
            let level = match record.level().and_then(LogLevel::from_value) {
                Some(level) => level.as_str().to_string(),
                None => format!("LVL{}", js::display(record.get("level"))),
            };
            format!("{} - {}\n", level, js::display(record.get("msg")))
        }
        OutputMode::Json(indent) => format!("{}\n", to_json(record.fields(), indent)),
        OutputMode::Bunyan => format!("{}\n", to_json(record.fields(), 0)),
        OutputMode::Inspect => format!("{:#?}\n", record.fields()),
    }
}

/// JSON with `indent` spaces per level, or compact for 0
fn to_json(fields: &Map<String, Value>, indent: usize) -> String {
    let compact = || serde_json::to_string(fields).unwrap_or_default();
    if indent == 0 {
        return compact();
    }

    let pad = " ".repeat(indent);
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(pad.as_bytes()));
    if fields.serialize(&mut serializer).is_err() {
        return compact();
    }
    String::from_utf8(out).unwrap_or_else(|_| compact())
}

#[cfg(test)]
mod tests {
    use super::*;
    use logmux_logs::LogParser;
    use logmux_types::Classified;
    use pretty_assertions::assert_eq;

    const LINE: &str = r#"{"v":0,"level":50,"name":"app","hostname":"host","pid":42,"time":"2024-01-15T10:30:00.000Z","msg":"failed","err":{"message":"boom","name":"Error","stack":"Error: boom\n    at foo"}}"#;

    fn entry(line: &str) -> PendingEntry {
        match LogParser::classify(line) {
            Classified::Valid(record) => PendingEntry::structured(line.to_string(), record),
            _ => PendingEntry::raw(line.to_string()),
        }
    }

    #[test]
    fn test_raw_lines_pass_through() {
        let config = RenderConfig::default();
        assert_eq!(render_entry(&entry("not json at all"), &config), "not json at all\n");

        // Missing required fields bypasses every mode
        let invalid = r#"{"msg":"no level"}"#;
        for mode in [OutputMode::Long, OutputMode::Json(2), OutputMode::Bunyan] {
            assert_eq!(render_entry(&entry(invalid), &RenderConfig::new(mode)), format!("{}\n", invalid));
        }
    }

    #[test]
    fn test_error_record_long() {
        let out = render_entry(&entry(LINE), &RenderConfig::default());
        assert_eq!(
            out,
            "[2024-01-15T10:30:00.000Z] ERROR: app/42 on host: failed\n    Error: boom\n        at foo\n"
        );
        assert!(!out.contains("err"));
    }

    #[test]
    fn test_simple_mode() {
        let out = render_entry(&entry(LINE), &RenderConfig::new(OutputMode::Simple));
        assert_eq!(out, "ERROR - failed\n");
    }

    #[test]
    fn test_compact_json_round_trip() {
        let original = entry(LINE);
        let out = render_entry(&original, &RenderConfig::new(OutputMode::Bunyan));
        assert!(out.ends_with('\n'));
        assert_eq!(out.trim_end().lines().count(), 1);

        let reparsed = match LogParser::classify(out.trim_end()) {
            Classified::Valid(record) => record,
            other => panic!("not valid: {:?}", other),
        };
        assert_eq!(Some(reparsed), original.record);
    }

    #[test]
    fn test_json_indent() {
        let rec = entry(r#"{"v":0,"level":30,"name":"a","hostname":"h","pid":1,"time":"t","msg":"m"}"#);
        let out = render_entry(&rec, &RenderConfig::new(OutputMode::Json(4)));
        assert!(out.starts_with("{\n    \"v\": 0,\n    \"level\": 30,"));
        assert!(out.ends_with("}\n"));

        let out = render_entry(&rec, &RenderConfig::new(OutputMode::Json(0)));
        assert_eq!(out, r#"{"v":0,"level":30,"name":"a","hostname":"h","pid":1,"time":"t","msg":"m"}"#.to_string() + "\n");
    }

    #[test]
    fn test_inspect_mode() {
        let out = render_entry(&entry(LINE), &RenderConfig::new(OutputMode::Inspect));
        assert!(out.starts_with("{\n"));
        assert!(out.contains("\"msg\": String(\"failed\"),"));
    }
}
