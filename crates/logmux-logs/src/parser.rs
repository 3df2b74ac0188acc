use serde_json::Value;

use logmux_types::{Classified, Record};

/// Classifier deciding what kind of line we are looking at
pub struct LogParser;

impl LogParser {
    /// Classify a raw line. Never fails: anything that is not a complete
    /// structured record degrades to `PassThrough` or `Invalid`.
    pub fn classify(line: &str) -> Classified {
        let trimmed = line.trim_start();
        if !trimmed.starts_with('{') {
            return Classified::PassThrough(line.to_string());
        }

        match Self::try_parse_record(trimmed) {
            Some(record) => Classified::Valid(record),
            None => Classified::Invalid(line.to_string()),
        }
    }

    /// Try to parse content as a JSON object carrying every required field
    fn try_parse_record(content: &str) -> Option<Record> {
        let value: Value = serde_json::from_str(content).ok()?;
        match value {
            Value::Object(fields) => Record::from_fields(fields),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"v":0,"level":30,"name":"app","hostname":"box","pid":42,"time":"2024-01-15T10:30:00.000Z","msg":"hello"}"#;

    #[test]
    fn test_parse_valid_record() {
        match LogParser::classify(VALID) {
            Classified::Valid(record) => {
                assert_eq!(record.level(), Some(30));
                assert_eq!(record.get("msg"), Some(&Value::from("hello")));
            }
            other => panic!("expected valid record, got {:?}", other),
        }
    }

    #[test]
    fn test_leading_whitespace_still_json() {
        let line = format!("   {}", VALID);
        assert!(matches!(LogParser::classify(&line), Classified::Valid(_)));
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(
            LogParser::classify("not json at all"),
            Classified::PassThrough("not json at all".to_string())
        );
        assert_eq!(
            LogParser::classify(""),
            Classified::PassThrough(String::new())
        );
    }

    #[test]
    fn test_broken_json_is_invalid() {
        let line = r#"{"level":30,"msg":"#;
        assert_eq!(
            LogParser::classify(line),
            Classified::Invalid(line.to_string())
        );
    }

    #[test]
    fn test_missing_required_field_is_invalid() {
        let line = r#"{"level":30,"msg":"no name","time":"2024-01-15T10:30:00Z"}"#;
        assert!(matches!(LogParser::classify(line), Classified::Invalid(_)));
    }

    #[test]
    fn test_classification_is_total() {
        let inputs = [
            "{",
            "}",
            "{}",
            "{\"v\":",
            "{\u{0}}",
            "{ \"a\": [1, 2, {\"b\": null}] }",
            "\u{fffd}{",
            "   ",
            "{\"v\":0,\"level\":null}",
        ];
        for input in inputs {
            match LogParser::classify(input) {
                Classified::PassThrough(s) | Classified::Invalid(s) => assert_eq!(s, input),
                Classified::Valid(_) => panic!("{:?} should not be valid", input),
            }
        }
    }
}
