mod config;

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use logmux_logs::{Pipeline, PipelineReport};
use logmux_render::RecordWriter;

use config::{Options, Settings};

/// Bad flags, settings or conditions
const EXIT_USAGE: u8 = 1;

/// At least one input could not be read
const EXIT_SOURCE_FAILED: u8 = 2;

/// logmux - Merge, filter and pretty-print structured JSON log streams
#[derive(Parser, Debug)]
#[command(name = "logmux")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log files to merge by time (`.gz` files are decompressed); reads
    /// stdin when none are given
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Only show records at or above this level (name or number)
    #[arg(short, long, value_name = "LEVEL")]
    level: Option<String>,

    /// Only show records for which this expression is true, e.g.
    /// `this.user == "bob"` (repeatable)
    #[arg(short = 'c', long = "condition", value_name = "EXPR")]
    conditions: Vec<String>,

    /// Drop lines that are not valid log records
    #[arg(long)]
    strict: bool,

    /// Output mode: long, short, simple, json, json-N, bunyan, inspect
    #[arg(short, long, value_name = "MODE")]
    output: Option<String>,

    /// Same as `-o json`
    #[arg(short = 'j', conflicts_with = "output")]
    json: bool,

    /// Same as `-o bunyan`
    #[arg(short = '0', conflicts_with_all = ["output", "json"])]
    bunyan: bool,

    /// Show times in utc or local time
    #[arg(short = 'L', long, value_name = "ZONE")]
    time: Option<String>,

    /// Force colour output
    #[arg(long, conflicts_with = "no_color")]
    color: bool,

    /// Disable colour output
    #[arg(long)]
    no_color: bool,

    /// Settings file (default: ~/.config/logmux/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Logs go to stderr; stdout carries the records
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let options = match Settings::load(args.config.as_deref())
        .and_then(|settings| Options::resolve(args, settings, io::stdout().is_terminal()))
    {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let report = runtime.block_on(run_app(options));
    // A reader parked on stdin never finishes on its own
    runtime.shutdown_background();

    for (source, error) in &report.failed {
        eprintln!("logmux: {}: {}", source, error);
    }

    if report.has_failures() {
        ExitCode::from(EXIT_SOURCE_FAILED)
    } else {
        ExitCode::SUCCESS
    }
}

/// `RUST_LOG` directives if set, warnings otherwise
fn log_filter(directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directives.unwrap_or_default())
}

async fn run_app(options: Options) -> PipelineReport {
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let mut writer = RecordWriter::new(options.render, io::stdout());
    let report = Pipeline::new(options.filter)
        .run(options.sources, &mut writer, cancel)
        .await;

    for (source, stats) in &report.stats {
        tracing::debug!(
            source = %source,
            lines = stats.lines,
            kept = stats.kept,
            dropped = stats.dropped,
            "source summary"
        );
    }
    tracing::debug!(
        written = writer.written(),
        sink_closed = report.sink_closed,
        cancelled = report.cancelled,
        "done"
    );
    report
}

/// Ctrl-C stops reading; what is already buffered is still written
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupted");
            cancel.cancel();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults_to_warn() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(log_filter(Some("")).max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_log_filter_follows_rust_log() {
        assert_eq!(log_filter(Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(log_filter(Some("error")).max_level_hint(), Some(LevelFilter::ERROR));
        assert_eq!(
            log_filter(Some("logmux_logs=trace")).max_level_hint(),
            Some(LevelFilter::TRACE)
        );
    }
}
