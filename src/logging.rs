//! Logging setup.
//!
//! `LogContext::init` installs the global subscriber once: a stderr layer
//! and a daily-rolling `automation.<date>.log` file under the log directory.
//! Keep the context alive for the whole run; dropping it flushes the file.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::ConfigError;

/// File name prefix of the rolling log.
pub const LOG_FILE_PREFIX: &str = "automation";

/// Handle on the installed logging pipeline.
pub struct LogContext {
    log_dir: PathBuf,
    _guard: WorkerGuard,
}

impl LogContext {
    pub fn init(log_dir: &Path) -> Result<Self, ConfigError> {
        std::fs::create_dir_all(log_dir)?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .build(log_dir)
            .map_err(|e| ConfigError::InvalidValue {
                key: "TRIAGE_LOG_DIR".into(),
                message: e.to_string(),
            })?;
        let (file_writer, guard) = tracing_appender::non_blocking(appender);

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(fmt::layer().with_ansi(false).with_writer(file_writer))
            .try_init()
            .map_err(|e| ConfigError::InvalidValue {
                key: "RUST_LOG".into(),
                message: format!("logging already initialised: {e}"),
            })?;

        Ok(Self {
            log_dir: log_dir.to_path_buf(),
            _guard: guard,
        })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}
