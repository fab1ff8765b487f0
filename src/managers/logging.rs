//! Logging manager with file rotation
//!
//! Provides dual-output logging:
//! - Console: stdout, configured level
//! - File (optional): same events, daily rotation, last 7 files kept

use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::{FmtSpan, Writer};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Prefix of every log file name; the appender adds a `.YYYY-MM-DD` suffix
pub const LOG_FILE_PREFIX: &str = "pg-backup-manager.log";

/// Number of daily log files kept
pub const DEFAULT_MAX_FILES: u32 = 7;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for log files, console only when absent
    pub log_directory: Option<PathBuf>,
    pub log_level: Level,
    /// Maximum number of log files to keep
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_directory: None,
            log_level: Level::INFO,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

impl LoggingConfig {
    /// Create from resolved settings values
    pub fn from_config(log_directory: Option<&Path>, log_level: &str) -> Self {
        Self {
            log_directory: log_directory.map(Path::to_path_buf),
            log_level: parse_level(log_level),
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

fn parse_level(log_level: &str) -> Level {
    match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Local time in the `date(1)` layout, e.g. `[Mon Mar 04 02:00:01 +01:00 2024]`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTimestamp;

impl FormatTime for LocalTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "[{}]", Local::now().format("%a %b %d %H:%M:%S %Z %Y"))
    }
}

/// Initialize logging with console and optional file outputs
///
/// Returns a guard that must be kept alive for the duration of the program.
/// When the guard is dropped, any remaining logs are flushed to disk.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let mut file_guard = None;

    let file_layer = match config.log_directory {
        Some(ref log_dir) => {
            fs::create_dir_all(log_dir)
                .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

            // Create rolling file appender (daily rotation)
            let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            file_guard = Some(guard);

            cleanup_old_logs(log_dir, config.max_files)?;

            Some(
                fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false) // No colors in file
                    .with_timer(LocalTimestamp)
                    .with_target(false)
                    .with_level(true)
                    .with_span_events(FmtSpan::NONE)
                    .with_filter(level_filter(config.log_level)),
            )
        }
        None => None,
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        // Plain text when redirected to a file or mailed by cron
        .with_ansi(std::io::stdout().is_terminal())
        .with_timer(LocalTimestamp)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::NONE)
        .with_filter(level_filter(config.log_level));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install logging subscriber")?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

/// Level filter for a layer, `RUST_LOG` takes precedence
fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy()
}

/// Cleanup old log files, keeping only the most recent N files
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    let mut log_files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with(LOG_FILE_PREFIX)
        })
        .collect();

    // Sort by modification time (newest first)
    log_files.sort_by(|a, b| {
        let a_time = a.metadata().and_then(|m| m.modified()).ok();
        let b_time = b.metadata().and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time)
    });

    // Remove files beyond the limit
    for file in log_files.into_iter().skip(max_files as usize) {
        if let Err(e) = fs::remove_file(file.path()) {
            tracing::warn!("Failed to remove old log file {:?}: {}", file.path(), e);
        } else {
            tracing::debug!("Removed old log file: {:?}", file.path());
        }
    }

    Ok(())
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any remaining logs to disk.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}
