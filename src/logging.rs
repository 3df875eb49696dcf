use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// How and where to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Directory for the daily rotating log files
    pub log_dir: Utf8PathBuf,
    /// Prefix of the log file names
    pub log_prefix: String,
    /// Debug level instead of info
    pub debug: bool,
    /// Also log to the terminal
    pub console: bool,
    /// Write the log file as JSON lines
    pub json: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            log_dir: Utf8PathBuf::from("logs"),
            log_prefix: crate::APP_NAME.to_string(),
            debug: false,
            console: true,
            json: false,
        }
    }
}

/// Level filter for the given debug flag. `RUST_LOG` still wins when set.
pub fn env_filter(debug: bool) -> EnvFilter {
    let default = if debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Create the log directory if needed.
pub fn ensure_log_dir(log_dir: &Utf8Path) -> Result<()> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir).with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }
    Ok(())
}

/// Install the global subscriber: a daily rotating file plus optional console output.
///
/// # Returns
/// A guard that must be held for the duration of the program to keep file logging
/// active; dropping it flushes the non-blocking writer.
pub fn setup_logging(options: &LoggingOptions) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    ensure_log_dir(&options.log_dir)?;

    let file_appender = rolling::daily(&options.log_dir, &options.log_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let (text_layer, json_layer) = if options.json {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            ),
        )
    } else {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false) // No ANSI codes in log files
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            ),
            None,
        )
    };

    let console_layer = options.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter(options.debug))
        .with(text_layer)
        .with(json_layer)
        .with(console_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}",
        options.log_dir,
        options.log_prefix,
        options.debug,
        options.console
    );

    Ok(guard)
}
