//! Process-wide logging bootstrap.
//!
//! # Responsibility
//! - Start the rolling file logger once per process from `LoggingConfig`.
//! - Keep log events metadata-only (`event=... module=... status=...`).
//!
//! # Invariants
//! - Initialization is idempotent for the same level and directory.
//! - Re-initialization with a different level or directory is rejected.
//! - Initialization never panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::info;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const LOG_FILE_BASENAME: &str = "lazyrow";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

static LOGGER: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    level: &'static str,
    log_dir: PathBuf,
    _handle: LoggerHandle,
}

/// Logging settings, usually deserialized from the host's config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`, case-insensitive.
    #[serde(default = "default_level_string")]
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            level: level.into(),
            log_dir: log_dir.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingError {
    UnsupportedLevel(String),
    RelativeLogDir(PathBuf),
    AlreadyInitialized {
        level: &'static str,
        log_dir: PathBuf,
    },
    Backend(String),
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::RelativeLogDir(dir) => {
                write!(f, "log_dir must be an absolute path, got `{}`", dir.display())
            }
            Self::AlreadyInitialized { level, log_dir } => write!(
                f,
                "logging already initialized with level `{level}` at `{}`",
                log_dir.display()
            ),
            Self::Backend(message) => write!(f, "logger backend failed: {message}"),
        }
    }
}

impl Error for LoggingError {}

/// Starts file logging, or confirms the identical configuration is active.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let level = normalize_level(&config.level)?;
    if !config.log_dir.is_absolute() {
        return Err(LoggingError::RelativeLogDir(config.log_dir.clone()));
    }

    let active = LOGGER.get_or_try_init(|| start_logger(level, config.log_dir.clone()))?;
    if active.level != level || active.log_dir != config.log_dir {
        return Err(LoggingError::AlreadyInitialized {
            level: active.level,
            log_dir: active.log_dir.clone(),
        });
    }
    Ok(())
}

/// Active `(level, log_dir)`, or `None` before `init_logging`.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    LOGGER
        .get()
        .map(|active| (active.level, active.log_dir.clone()))
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn default_level_string() -> String {
    default_log_level().to_string()
}

fn start_logger(level: &'static str, log_dir: PathBuf) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(&log_dir).map_err(|err| {
        LoggingError::Backend(format!(
            "failed to create log directory `{}`: {err}",
            log_dir.display()
        ))
    })?;

    let handle = Logger::try_with_str(level)
        .map_err(|err| LoggingError::Backend(err.to_string()))?
        .log_to_file(
            FileSpec::default()
                .directory(log_dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| LoggingError::Backend(err.to_string()))?;

    info!(
        "event=core_init module=logging status=ok level={} log_dir={} version={}",
        level,
        log_dir.display(),
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        level,
        log_dir,
        _handle: handle,
    })
}

fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(LoggingError::UnsupportedLevel(other.to_string())),
    }
}
