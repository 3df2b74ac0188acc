//! Shared types for logmux
//!
//! This crate contains data structures used across multiple logmux crates.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Severity
// ============================================================================

/// Log severity level on the fixed 10..60 scale
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// All levels, lowest first
    pub const ALL: [LogLevel; 6] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Fatal,
    ];

    /// Numeric value as written by the producer
    pub fn value(&self) -> i64 {
        match self {
            Self::Trace => 10,
            Self::Debug => 20,
            Self::Info => 30,
            Self::Warn => 40,
            Self::Error => 50,
            Self::Fatal => 60,
        }
    }

    /// Level for an exact numeric value
    pub fn from_value(value: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.value() == value)
    }

    /// Level for a name, case-insensitive
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "fatal" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Parse a threshold given either as a level name or a raw integer
    pub fn parse_threshold(s: &str) -> Option<i64> {
        let s = s.trim();
        match s.parse::<i64>() {
            Ok(n) => Some(n),
            Err(_) => Self::from_name(s).map(|l| l.value()),
        }
    }

    /// Upper-case name, as bound in predicate expressions
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    /// Upper-case name left-padded to five columns
    pub fn padded(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => " INFO",
            Self::Warn => " WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// Field names every structured record must carry
pub const REQUIRED_FIELDS: [&str; 7] = ["v", "level", "name", "hostname", "pid", "time", "msg"];

/// One structured log record, fields kept in input order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Wrap a parsed JSON object, rejecting it if a required field is
    /// missing or null
    pub fn from_fields(fields: Map<String, Value>) -> Option<Self> {
        let complete = REQUIRED_FIELDS
            .iter()
            .all(|key| fields.get(*key).is_some_and(|v| !v.is_null()));
        complete.then_some(Self { fields })
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Numeric severity, if the `level` field is an integer
    pub fn level(&self) -> Option<i64> {
        self.fields.get("level").and_then(Value::as_i64)
    }

    /// Raw `time` field, if it is a string
    pub fn time(&self) -> Option<&str> {
        self.fields.get("time").and_then(Value::as_str)
    }

    /// Parsed `time` field. Times without an offset are taken as UTC.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.time()?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NAIVE_TIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|ts| ts.and_utc())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// ISO 8601 forms accepted without a UTC offset
const NAIVE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Outcome of classifying one input line
#[derive(Clone, Debug, PartialEq)]
pub enum Classified {
    /// Empty, or not starting with `{`
    PassThrough(String),
    /// Looks like JSON but does not parse or lacks required fields
    Invalid(String),
    /// A structured record
    Valid(Record),
}

// ============================================================================
// Pending entries
// ============================================================================

/// A kept line waiting in its source buffer for emission
#[derive(Clone, Debug, PartialEq)]
pub struct PendingEntry {
    /// Original line text, without terminator
    pub line: String,

    /// Parsed record, or None for pass-through and invalid lines
    pub record: Option<Record>,

    /// Parsed timestamp, or None when absent or unparsable
    pub timestamp: Option<DateTime<Utc>>,
}

impl PendingEntry {
    /// Entry for a line forwarded verbatim
    pub fn raw(line: String) -> Self {
        Self {
            line,
            record: None,
            timestamp: None,
        }
    }

    /// Entry for a structured record
    pub fn structured(line: String, record: Record) -> Self {
        let timestamp = record.timestamp();
        Self {
            line,
            record: Some(record),
            timestamp,
        }
    }
}
