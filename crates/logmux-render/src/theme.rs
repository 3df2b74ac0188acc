use crossterm::style::{Color, ContentStyle, Stylize};

use logmux_types::LogLevel;

/// Wraps text in a style. Swapped out to turn colour on or off.
pub type Decorate = fn(&str, &ContentStyle) -> String;

/// Color theme for rendered records
pub struct Theme;

impl Theme {
    // Log level colors
    pub const LOG_TRACE: Color = Color::White;
    pub const LOG_DEBUG: Color = Color::Yellow;
    pub const LOG_INFO: Color = Color::Cyan;
    pub const LOG_WARN: Color = Color::Magenta;
    pub const LOG_ERROR: Color = Color::Red;

    // Field colors
    pub const SOURCE: Color = Color::Green;
    pub const MESSAGE: Color = Color::Cyan;

    /// Style for a level label. FATAL is shown in reverse video.
    pub fn level(level: LogLevel) -> ContentStyle {
        match level {
            LogLevel::Trace => ContentStyle::new().with(Self::LOG_TRACE),
            LogLevel::Debug => ContentStyle::new().with(Self::LOG_DEBUG),
            LogLevel::Info => ContentStyle::new().with(Self::LOG_INFO),
            LogLevel::Warn => ContentStyle::new().with(Self::LOG_WARN),
            LogLevel::Error => ContentStyle::new().with(Self::LOG_ERROR),
            LogLevel::Fatal => ContentStyle::new().reverse(),
        }
    }

    /// Call-site `(file:line in func)`
    pub fn source() -> ContentStyle {
        ContentStyle::new().with(Self::SOURCE)
    }

    pub fn message() -> ContentStyle {
        ContentStyle::new().with(Self::MESSAGE)
    }
}

/// No escape codes
pub fn decorate_plain(text: &str, _style: &ContentStyle) -> String {
    text.to_string()
}

/// ANSI escape codes around the text
pub fn decorate_ansi(text: &str, style: &ContentStyle) -> String {
    if text.is_empty() {
        return String::new();
    }
    style.apply(text).to_string()
}
