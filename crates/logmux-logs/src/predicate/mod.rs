//! Predicate expressions evaluated against records
//!
//! A small JavaScript-flavoured expression language. The only names an
//! expression can see are the record's top-level fields, `this` (the record
//! itself) and the level constants `TRACE`..`FATAL`.
//!
//! ```text
//! level >= WARN && name == "api"
//! this.req.method === 'POST'
//! msg =~ "timeout|refused"
//! ```

mod eval;
mod lexer;
mod parser;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value as JsonValue, json};

use logmux_types::{LogLevel, Record};

use crate::error::{EvalError, PredicateError};
use eval::Scope;
use parser::Expr;

/// A compiled predicate expression
#[derive(Clone, Debug)]
pub struct Predicate {
    source: String,
    expr: Expr,
}

impl Predicate {
    /// Compile an expression
    pub fn compile(source: &str) -> Result<Self, PredicateError> {
        Ok(Self {
            source: source.to_string(),
            expr: parser::parse(source)?,
        })
    }

    /// Original expression text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against raw fields and report truthiness
    pub fn evaluate(&self, fields: &Map<String, JsonValue>) -> Result<bool, EvalError> {
        Scope::new(fields).eval(&self.expr).map(|v| v.truthy())
    }

    /// Evaluate against a record
    pub fn test(&self, record: &Record) -> Result<bool, EvalError> {
        self.evaluate(record.fields())
    }
}

/// The smallest record a producer could emit, used to vet predicates at
/// startup
pub fn minimal_record() -> Map<String, JsonValue> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    match json!({
        "v": 0,
        "level": LogLevel::Info.value(),
        "name": "name",
        "hostname": "hostname",
        "pid": 123,
        "time": now,
        "msg": "msg",
    }) {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_and_evaluate() {
        let predicate = Predicate::compile("level == INFO && msg == 'msg'").unwrap();
        assert_eq!(predicate.source(), "level == INFO && msg == 'msg'");
        assert_eq!(predicate.evaluate(&minimal_record()), Ok(true));
    }

    #[test]
    fn test_minimal_record_is_a_record() {
        let record = Record::from_fields(minimal_record()).unwrap();
        assert!(record.timestamp().is_some());
    }
}
