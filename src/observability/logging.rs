//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Console output, pretty or JSON
//! - Optional daily rolling log files
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - [`LOG_DIR_ENV`] wins over the configured log directory
//! - File output goes through a non-blocking writer; keep the returned guard alive

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{LogFormat, LoggingConfig};

/// Environment variable selecting the log folder.
pub const LOG_DIR_ENV: &str = "WAYPOST_LOG_DIR";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to create log file appender: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Flushes buffered file output when dropped.
#[derive(Debug)]
pub struct LoggingGuard {
    file: Option<WorkerGuard>,
}

impl LoggingGuard {
    pub fn writes_to_file(&self) -> bool {
        self.file.is_some()
    }
}

/// Log directory to use: the environment variable first, then the config.
pub fn resolve_log_directory(env_value: Option<String>, config: &LoggingConfig) -> Option<PathBuf> {
    env_value
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| config.directory.clone())
}

fn env_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).map_err(|e| LoggingError::Filter(e.to_string())),
    }
}

/// Install the global subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let filter = env_filter(&config.level)?;

    let console = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_current_span(true).boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(true).boxed(),
    };

    let directory = resolve_log_directory(std::env::var(LOG_DIR_ENV).ok(), config);
    let (file, guard) = match &directory {
        Some(directory) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(config.file_prefix.as_str())
                .build(directory)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;

    if let Some(directory) = directory {
        tracing::info!(directory = %directory.display(), "Writing logs to folder");
    }

    Ok(LoggingGuard { file: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_directory_overrides_config() {
        let mut config = LoggingConfig::default();
        assert_eq!(resolve_log_directory(None, &config), None);

        config.directory = Some(PathBuf::from("/from/config"));
        assert_eq!(resolve_log_directory(None, &config), Some(PathBuf::from("/from/config")));
        assert_eq!(
            resolve_log_directory(Some("/from/env".into()), &config),
            Some(PathBuf::from("/from/env"))
        );
        assert_eq!(resolve_log_directory(Some("  ".into()), &config), Some(PathBuf::from("/from/config")));
    }

    #[test]
    fn test_bad_level_is_rejected() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        assert!(matches!(env_filter("waypost=loud"), Err(LoggingError::Filter(_))));
    }
}
