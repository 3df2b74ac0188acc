//! Settings file and option resolution
//!
//! Settings are read from `--config PATH` or, when present,
//! `~/.config/logmux/config.toml`. Command-line flags win over the file;
//! conditions from both are combined.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use logmux_logs::{RecordFilter, SourceSpec};
use logmux_render::{DEFAULT_JSON_INDENT, OutputMode, RenderConfig, TimeFormat};

use crate::Args;

/// Level given either as a name or a number
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LevelSetting {
    Name(String),
    Value(i64),
}

/// Contents of the settings file
#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub output: Option<String>,
    pub level: Option<LevelSetting>,
    pub strict: Option<bool>,
    pub color: Option<bool>,
    pub time: Option<String>,
    pub conditions: Vec<String>,
}

impl Settings {
    /// `~/.config/logmux/config.toml`
    fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".config").join("logmux").join("config.toml"))
    }

    /// Load an explicit settings file, or the default one if it exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// Everything a run needs, after merging flags and settings
#[derive(Debug)]
pub struct Options {
    pub sources: Vec<SourceSpec>,
    pub filter: RecordFilter,
    pub render: RenderConfig,
}

impl Options {
    /// Merge flags over settings. Colour falls back to whether stdout is a
    /// terminal.
    pub fn resolve(args: Args, settings: Settings, stdout_is_terminal: bool) -> Result<Self> {
        let mode = if args.json {
            OutputMode::Json(DEFAULT_JSON_INDENT)
        } else if args.bunyan {
            OutputMode::Bunyan
        } else {
            match args.output.or(settings.output) {
                Some(mode) => mode.parse::<OutputMode>()?,
                None => OutputMode::default(),
            }
        };

        let time_format = match args.time.or(settings.time) {
            Some(time) => time.parse::<TimeFormat>()?,
            None => TimeFormat::default(),
        };

        let color = if args.color {
            true
        } else if args.no_color {
            false
        } else {
            settings.color.unwrap_or(stdout_is_terminal)
        };

        let strict = args.strict || settings.strict.unwrap_or(false);
        let mut filter = RecordFilter::new().strict(strict);

        let level = args.level.or(settings.level.map(|level| match level {
            LevelSetting::Name(name) => name,
            LevelSetting::Value(value) => value.to_string(),
        }));
        if let Some(level) = level {
            filter = filter.with_level_name(&level)?;
        }

        for condition in settings.conditions.iter().chain(&args.conditions) {
            filter = filter.with_condition(condition)?;
        }

        let sources = if args.files.is_empty() {
            vec![SourceSpec::Stdin]
        } else {
            args.files.into_iter().map(SourceSpec::File).collect()
        };

        Ok(Self {
            sources,
            filter,
            render: RenderConfig::new(mode)
                .with_time_format(time_format)
                .with_color(color),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("logmux").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let options = Options::resolve(args(&[]), Settings::default(), false).unwrap();
        assert_eq!(options.sources, vec![SourceSpec::Stdin]);
        assert_eq!(options.render.mode, OutputMode::Long);
        assert_eq!(options.render.time_format, TimeFormat::Utc);
        assert!(options.filter.is_empty());
    }

    #[test]
    fn test_flags() {
        let options = Options::resolve(
            args(&["-l", "warn", "-c", "level > 0", "--strict", "-o", "short", "-L", "local", "a.log", "b.log.gz"]),
            Settings::default(),
            false,
        )
        .unwrap();
        assert_eq!(
            options.sources,
            vec![
                SourceSpec::File("a.log".into()),
                SourceSpec::File("b.log.gz".into())
            ]
        );
        assert_eq!(options.filter.min_level(), Some(40));
        assert!(options.filter.is_strict());
        assert_eq!(options.render.mode, OutputMode::Short);
        assert_eq!(options.render.time_format, TimeFormat::Local);
    }

    #[test]
    fn test_json_shortcuts() {
        let json = Options::resolve(args(&["-j"]), Settings::default(), false).unwrap();
        assert_eq!(json.render.mode, OutputMode::Json(2));
        let compact = Options::resolve(args(&["-0"]), Settings::default(), false).unwrap();
        assert_eq!(compact.render.mode, OutputMode::Bunyan);
        assert!(Args::try_parse_from(["logmux", "-j", "-o", "short"]).is_err());
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings {
            output: Some("simple".into()),
            level: Some(LevelSetting::Value(50)),
            strict: Some(true),
            ..Default::default()
        };
        let options = Options::resolve(args(&["-o", "bunyan", "-l", "info"]), settings, false).unwrap();
        assert_eq!(options.render.mode, OutputMode::Bunyan);
        assert_eq!(options.filter.min_level(), Some(30));
        assert!(options.filter.is_strict());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Options::resolve(args(&["-o", "fancy"]), Settings::default(), false).is_err());
        assert!(Options::resolve(args(&["-l", "loud"]), Settings::default(), false).is_err());
        assert!(Options::resolve(args(&["-c", "nosuchfield == 1"]), Settings::default(), false).is_err());
        assert!(Options::resolve(args(&["--time", "mars"]), Settings::default(), false).is_err());
    }

    #[test]
    fn test_load_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "output = \"short\"\nlevel = \"error\"\ncolor = false\nconditions = [\"this.user == 'bob'\"]"
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.output.as_deref(), Some("short"));
        assert_eq!(settings.level, Some(LevelSetting::Name("error".into())));
        assert_eq!(settings.conditions.len(), 1);

        let options = Options::resolve(args(&[]), settings, true).unwrap();
        assert_eq!(options.filter.min_level(), Some(50));
        assert_eq!(options.render.mode, OutputMode::Short);
    }

    #[test]
    fn test_bad_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "colour = true").unwrap();
        assert!(Settings::load(Some(file.path())).is_err());

        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
