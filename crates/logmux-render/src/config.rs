use std::str::FromStr;

use thiserror::Error;

use crate::theme::{Decorate, decorate_ansi, decorate_plain};

/// Indent used by `json` without an explicit width
pub const DEFAULT_JSON_INDENT: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown output mode {0:?} (expected long, short, simple, json, json-N, bunyan or inspect)")]
    UnknownOutputMode(String),

    #[error("unknown time format {0:?} (expected utc or local)")]
    UnknownTimeFormat(String),
}

/// How each record is written out
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Multi-line, all origin fields
    #[default]
    Long,
    /// Multi-line, time of day and name only
    Short,
    /// `LEVEL - msg`
    Simple,
    /// JSON with the given indent; 0 is compact
    Json(usize),
    /// Compact JSON, one record per line
    Bunyan,
    /// Debug dump of the parsed record
    Inspect,
}

impl FromStr for OutputMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "long" => Ok(Self::Long),
            "short" => Ok(Self::Short),
            "simple" => Ok(Self::Simple),
            "json" => Ok(Self::Json(DEFAULT_JSON_INDENT)),
            "bunyan" => Ok(Self::Bunyan),
            "inspect" => Ok(Self::Inspect),
            other => other
                .strip_prefix("json-")
                .and_then(|n| n.parse().ok())
                .map(Self::Json)
                .ok_or_else(|| ConfigError::UnknownOutputMode(s.to_string())),
        }
    }
}

/// How record times are shown in the long and short layouts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeFormat {
    #[default]
    Utc,
    Local,
}

impl FromStr for TimeFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "utc" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            _ => Err(ConfigError::UnknownTimeFormat(s.to_string())),
        }
    }
}

/// Rendering options
#[derive(Clone, Debug)]
pub struct RenderConfig {
    pub mode: OutputMode,
    pub time_format: TimeFormat,
    pub decorate: Decorate,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            time_format: TimeFormat::default(),
            decorate: decorate_plain,
        }
    }
}

impl RenderConfig {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn with_time_format(mut self, time_format: TimeFormat) -> Self {
        self.time_format = time_format;
        self
    }

    /// Turn ANSI colour on or off
    pub fn with_color(mut self, color: bool) -> Self {
        self.decorate = if color { decorate_ansi } else { decorate_plain };
        self
    }
}
