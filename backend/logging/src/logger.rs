//! Structured Logger
//!
//! Wraps `tracing` with an `EnvFilter` (`RUST_LOG` wins over the configured
//! level), a console layer on stderr and an optional rolling NDJSON file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "platelens.log";

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for `platelens.log.YYYY-MM-DD`; no file output when `None`.
    pub dir: Option<PathBuf>,
    /// NDJSON on the console instead of human-readable lines.
    pub json: bool,
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global logger. A second call is a no-op.
pub fn init_logger(options: &LogOptions) -> Result<()> {
    let file_layer = match &options.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            Some(fmt::layer().json().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    // stdout is reserved for command output.
    let (json_console, text_console) = if options.json {
        (
            Some(fmt::layer().json().with_writer(std::io::stderr)),
            None,
        )
    } else {
        (
            None,
            Some(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(true),
            ),
        )
    };

    let _ = tracing_subscriber::registry()
        .with(build_filter(&options.level))
        .with(json_console)
        .with(text_console)
        .with(file_layer)
        .try_init();
    Ok(())
}
