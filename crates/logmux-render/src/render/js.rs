//! Stringification rules of the JavaScript loggers that produce these
//! records, so field values print the way their authors expect.

use serde_json::{Number, Value};

/// Prefix for every line of a details block
const INDENT: &str = "    ";

pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// String conversion; a missing value is `undefined`
pub(crate) fn display(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(value) => to_string(value),
    }
}

fn to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_to_string(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Whole floats print without a fraction, as `String(42.0)` does
fn number_to_string(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f == 0.0 => "0".to_string(),
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        _ => n.to_string(),
    }
}

/// Two-space indented JSON
pub(crate) fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// JSON string literal
pub(crate) fn quote(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

/// Indent every line by four spaces
pub(crate) fn indent(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + INDENT.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(INDENT);
        out.push_str(line.strip_suffix('\r').unwrap_or(line));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display() {
        assert_eq!(display(None), "undefined");
        assert_eq!(display(Some(&json!("a b"))), "a b");
        assert_eq!(display(Some(&json!(42))), "42");
        assert_eq!(display(Some(&json!(42.0))), "42");
        assert_eq!(display(Some(&json!(-0.0))), "0");
        assert_eq!(display(Some(&json!(1.5))), "1.5");
        assert_eq!(display(Some(&json!(null))), "null");
        assert_eq!(display(Some(&json!([1, null, "x"]))), "1,,x");
        assert_eq!(display(Some(&json!({"a": 1}))), "[object Object]");
    }

    #[test]
    fn test_truthy() {
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!(null)));
        assert!(truthy(&json!("0")));
        assert!(truthy(&json!([])));
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent("a\r\nb\nc"), "    a\n    b\n    c");
        assert_eq!(indent(""), "    ");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("a \"b\""), r#""a \"b\"""#);
    }
}
