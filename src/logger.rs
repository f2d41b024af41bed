//! Structured logging: a daily rolling file plus a compact stderr layer.

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset. HTTP and windowing internals are
/// only interesting at warn.
pub const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn,winit=warn,eframe=warn";

const LOG_FILE_PREFIX: &str = "ganga";
const MAX_LOG_FILES: usize = 5;

/// Initialize the global subscriber.
///
/// Log files are written to `{log_dir}/ganga.<date>.log` with daily
/// rotation, keeping the latest five. If the directory or file cannot be
/// set up, logging continues on stderr alone and the cause is logged there.
/// Fails only if a subscriber is already set.
pub fn init(log_dir: &Path) -> anyhow::Result<()> {
    let (subscriber, file_error) = build(log_dir);
    subscriber.try_init().context("Logger already initialized")?;

    match file_error {
        None => tracing::info!(log_dir = %log_dir.display(), "Logger initialized"),
        Some(e) => tracing::warn!("Logging to stderr only: {:#}", e),
    }
    Ok(())
}

/// Assemble the subscriber without installing it. The error is why the
/// file layer was left out.
fn build(log_dir: &Path) -> (impl Subscriber + Send + Sync + 'static, Option<anyhow::Error>) {
    let (file_layer, file_error) = match file_appender(log_dir) {
        Ok(appender) => {
            let layer = fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), None)
        }
        Err(e) => (None, Some(e)),
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .compact();

    let subscriber = tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(console_layer);
    (subscriber, file_error)
}

fn file_appender(log_dir: &Path) -> anyhow::Result<RollingFileAppender> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(log_dir)
        .context("Failed to create log file appender")
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
