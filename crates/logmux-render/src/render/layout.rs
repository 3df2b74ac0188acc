use chrono::Local;
use serde_json::{Map, Value};

use logmux_types::{LogLevel, Record};

use super::{http, js};
use crate::config::{RenderConfig, TimeFormat};
use crate::theme::Theme;

/// Stringified values longer than this go to the details block
const EXTRA_MAX_LEN: usize = 50;

/// Separator between entries of the details block
const DETAILS_SEPARATOR: &str = "\n    --\n";

/// The multi-line human layout of one record, assembled from a read-only
/// view of its fields.
#[derive(Debug)]
pub(super) struct Layout {
    short: bool,
    time: String,
    level: String,
    name: String,
    host: String,
    src: String,
    /// Leading space included; empty when the message went to details
    message: String,
    extras: Vec<String>,
    details: Vec<String>,
}

impl Layout {
    pub(super) fn build(record: &Record, config: &RenderConfig, short: bool) -> Self {
        let fields = record.fields();
        let decorate = config.decorate;
        let mut consumed = vec!["v", "time", "name", "pid", "level", "hostname", "msg"];
        let mut exposed: Vec<(String, &Value)> = Vec::new();
        let mut extras = Vec::new();
        let mut details = Vec::new();

        let time = format_time(record, config.time_format, short);

        let mut name = js::display(fields.get("name"));
        if let Some(Value::String(component)) = fields.get("component") {
            consumed.push("component");
            if !component.is_empty() {
                name.push('/');
                name.push_str(component);
            }
        }
        if !short {
            name.push('/');
            name.push_str(&js::display(fields.get("pid")));
        }

        let level = match record.level().and_then(LogLevel::from_value) {
            Some(level) => decorate(level.padded(), &Theme::level(level)),
            None => format!("LVL{}", js::display(fields.get("level"))),
        };

        let mut src = String::new();
        if let Some(Value::Object(site)) = fields.get("src") {
            if site.get("file").is_some_and(js::truthy) {
                consumed.push("src");
                let location = format!(
                    "{}:{}",
                    js::display(site.get("file")),
                    js::display(site.get("line"))
                );
                let text = match site.get("func").filter(|f| js::truthy(f)) {
                    Some(func) => format!(" ({} in {})", location, js::display(Some(func))),
                    None => format!(" ({})", location),
                };
                src = decorate(&text, &Theme::source());
            }
        }

        let host = match fields.get("hostname") {
            Some(host) if js::truthy(host) => js::display(Some(host)),
            _ => "<no-hostname>".to_string(),
        };

        if let Some(req_id @ (Value::String(_) | Value::Number(_))) = fields.get("req_id") {
            consumed.push("req_id");
            if js::truthy(req_id) {
                extras.push(format!("req_id={}", js::display(Some(req_id))));
            }
        }

        let msg = js::display(fields.get("msg"));
        let message = if msg.contains('\n') {
            details.push(js::indent(&decorate(&msg, &Theme::message())));
            String::new()
        } else {
            format!(" {}", decorate(&msg, &Theme::message()))
        };

        type Section = for<'a> fn(&'a Map<String, Value>) -> http::HttpBlock<'a>;
        let sections: [(&str, Section); 4] = [
            ("req", http::request),
            ("client_req", http::client_request),
            ("res", http::response),
            ("client_res", http::response),
        ];
        for (key, section) in sections {
            if let Some(Value::Object(object)) = fields.get(key) {
                consumed.push(key);
                let block = section(object);
                if let Some(text) = block.text {
                    details.push(js::indent(&text));
                }
                exposed.extend(
                    block
                        .leftovers
                        .into_iter()
                        .map(|(field, value)| (format!("{}.{}", key, field), value)),
                );
            }
        }

        if let Some(Value::Object(err)) = fields.get("err") {
            if let Some(stack) = err.get("stack").filter(|s| js::truthy(s)) {
                consumed.push("err");
                details.push(js::indent(&js::display(Some(stack))));
                exposed.extend(
                    err.iter()
                        .filter(|(field, _)| !matches!(field.as_str(), "message" | "name" | "stack"))
                        .map(|(field, value)| (format!("err.{}", field), value)),
                );
            }
        }

        // Re-exposed fields replace a literal top-level key of the same name
        let mut leftover: Vec<(String, &Value)> = fields
            .iter()
            .filter(|(key, _)| !consumed.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value))
            .collect();
        for (key, value) in exposed {
            match leftover.iter_mut().find(|(existing, _)| *existing == key) {
                Some(slot) => slot.1 = value,
                None => leftover.push((key, value)),
            }
        }

        for (key, value) in leftover {
            let (text, stringified) = match value {
                Value::String(s) => (s.clone(), false),
                other => (js::pretty(other), true),
            };
            if text.contains('\n') || text.chars().count() > EXTRA_MAX_LEN {
                details.push(js::indent(&format!("{}: {}", key, text)));
            } else if !stringified && (text.is_empty() || text.contains(char::is_whitespace)) {
                extras.push(format!("{}={}", key, js::quote(&text)));
            } else {
                extras.push(format!("{}={}", key, text));
            }
        }

        Self {
            short,
            time,
            level,
            name,
            host,
            src,
            message,
            extras,
            details,
        }
    }

    fn extras(&self) -> String {
        if self.extras.is_empty() {
            String::new()
        } else {
            format!(" ({})", self.extras.join(", "))
        }
    }

    fn details(&self) -> String {
        if self.details.is_empty() {
            String::new()
        } else {
            format!("{}\n", self.details.join(DETAILS_SEPARATOR))
        }
    }

    /// Final text, newline-terminated
    pub(super) fn render(&self) -> String {
        if self.short {
            format!(
                "{} {} {}:{}{}\n{}",
                self.time,
                self.level,
                self.name,
                self.message,
                self.extras(),
                self.details()
            )
        } else {
            format!(
                "{} {}: {} on {}{}:{}{}\n{}",
                self.time,
                self.level,
                self.name,
                self.host,
                self.src,
                self.message,
                self.extras(),
                self.details()
            )
        }
    }
}

/// Long layout shows the full timestamp in brackets, short only the time
/// of day. A time that does not parse is shown as written.
fn format_time(record: &Record, format: TimeFormat, short: bool) -> String {
    let raw = js::display(record.get("time"));
    match (short, format, record.timestamp()) {
        (false, TimeFormat::Local, Some(ts)) => ts
            .with_timezone(&Local)
            .format("[%Y-%m-%dT%H:%M:%S%.3f%:z]")
            .to_string(),
        (false, _, _) => format!("[{}]", raw),
        (true, TimeFormat::Utc, Some(ts)) => ts.format("%H:%M:%S%.3fZ").to_string(),
        (true, TimeFormat::Local, Some(ts)) => ts.with_timezone(&Local).format("%H:%M:%S%.3f").to_string(),
        (true, _, None) => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputMode;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(extra: Value) -> Record {
        let mut fields = match json!({
            "v": 0,
            "level": 30,
            "name": "app",
            "hostname": "host",
            "pid": 42,
            "time": "2024-01-15T10:30:00.123Z",
            "msg": "hello",
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        if let Value::Object(extra) = extra {
            fields.extend(extra);
        }
        Record::from_fields(fields).unwrap()
    }

    fn long(record: &Record) -> String {
        Layout::build(record, &RenderConfig::new(OutputMode::Long), false).render()
    }

    fn short(record: &Record) -> String {
        Layout::build(record, &RenderConfig::new(OutputMode::Short), true).render()
    }

    #[test]
    fn test_minimal_long_and_short() {
        let rec = record(json!({}));
        assert_eq!(long(&rec), "[2024-01-15T10:30:00.123Z]  INFO: app/42 on host: hello\n");
        assert_eq!(short(&rec), "10:30:00.123Z  INFO app: hello\n");
    }

    #[test]
    fn test_component_src_and_req_id() {
        let rec = record(json!({
            "component": "db",
            "src": {"file": "pool.js", "line": 12, "func": "acquire"},
            "req_id": "abc-1",
        }));
        assert_eq!(
            long(&rec),
            "[2024-01-15T10:30:00.123Z]  INFO: app/db/42 on host (pool.js:12 in acquire): hello (req_id=abc-1)\n"
        );
        assert_eq!(short(&rec), "10:30:00.123Z  INFO app/db: hello (req_id=abc-1)\n");
    }

    #[test]
    fn test_error_stack_goes_to_details() {
        let rec = record(json!({
            "msg": "failed",
            "err": {"message": "boom", "name": "Error", "stack": "Error: boom\n    at foo", "code": "E1"},
        }));
        assert_eq!(
            long(&rec),
            "[2024-01-15T10:30:00.123Z]  INFO: app/42 on host: failed (err.code=E1)\n    Error: boom\n        at foo\n"
        );
    }

    #[test]
    fn test_error_without_stack_is_an_extra() {
        let rec = record(json!({"err": {"message": "boom"}}));
        assert_eq!(
            long(&rec),
            "[2024-01-15T10:30:00.123Z]  INFO: app/42 on host: hello\n    err: {\n      \"message\": \"boom\"\n    }\n"
        );
    }

    #[test]
    fn test_multiline_message() {
        let rec = record(json!({"msg": "line one\nline two"}));
        assert_eq!(
            long(&rec),
            "[2024-01-15T10:30:00.123Z]  INFO: app/42 on host:\n    line one\n    line two\n"
        );
    }

    #[test]
    fn test_extras_and_details() {
        let long_value = "x".repeat(51);
        let rec = record(json!({
            "user": "bob smith",
            "n": 5,
            "empty": "",
            "tag": "x",
            "big": long_value,
            "edge": "y".repeat(50),
            "obj": {"a": 1},
        }));
        let expected = format!(
            "[2024-01-15T10:30:00.123Z]  INFO: app/42 on host: hello (user=\"bob smith\", n=5, empty=\"\", tag=x, edge={})\n    big: {}\n    --\n    obj: {{\n      \"a\": 1\n    }}\n",
            "y".repeat(50),
            long_value
        );
        assert_eq!(long(&rec), expected);
    }

    #[test]
    fn test_http_objects() {
        let rec = record(json!({
            "req": {"method": "GET", "url": "/a", "remoteAddress": "10.0.0.1"},
            "res": {"statusCode": 200},
        }));
        assert_eq!(
            long(&rec),
            "[2024-01-15T10:30:00.123Z]  INFO: app/42 on host: hello (req.remoteAddress=10.0.0.1)\n    GET /a HTTP/1.1\n    --\n    HTTP/1.1 200 OK\n"
        );
    }

    #[test]
    fn test_exposed_field_replaces_literal_key() {
        let rec = record(json!({
            "req.extra": "literal",
            "other": 1,
            "req": {"method": "GET", "url": "/", "extra": "nested"},
        }));
        assert!(long(&rec).contains("(req.extra=nested, other=1)"));
    }

    #[test]
    fn test_unknown_level_and_missing_host() {
        let rec = record(json!({"level": 35, "hostname": ""}));
        assert_eq!(long(&rec), "[2024-01-15T10:30:00.123Z] LVL35: app/42 on <no-hostname>: hello\n");
    }

    #[test]
    fn test_wrongly_shaped_fields_are_extras() {
        let rec = record(json!({"component": 7, "src": "main.rs", "req": "GET /"}));
        assert_eq!(
            long(&rec),
            "[2024-01-15T10:30:00.123Z]  INFO: app/42 on host: hello (component=7, src=main.rs, req=\"GET /\")\n"
        );
    }

    #[test]
    fn test_unparsable_time_shown_raw() {
        let rec = record(json!({"time": "yesterday"}));
        assert!(long(&rec).starts_with("[yesterday]  INFO"));
        assert!(short(&rec).starts_with("yesterday  INFO"));
    }
}
