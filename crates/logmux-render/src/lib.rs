//! Output for logmux
//!
//! This crate renders records in the supported output modes and writes
//! them to the output sink.

mod config;
mod render;
mod sink;
mod theme;
mod writer;

pub use config::{ConfigError, DEFAULT_JSON_INDENT, OutputMode, RenderConfig, TimeFormat};
pub use render::{render_entry, render_record};
pub use sink::SinkWriter;
pub use theme::{Decorate, Theme, decorate_ansi, decorate_plain};
pub use writer::RecordWriter;
