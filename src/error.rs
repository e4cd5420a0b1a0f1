//! Error types for mail-triage.
//!
//! Only rule loading is fatal. Browser and application failures are
//! recovered inside the pipeline and end up as reportable outcomes.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rule load error: {0}")]
    RuleLoad(#[from] RuleLoadError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("UI error: {0}")]
    Ui(#[from] UiError),

    #[error("Message parse error: {0}")]
    Message(String),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rule table could not be read. Aborts session start.
#[derive(Debug, thiserror::Error)]
pub enum RuleLoadError {
    #[error("Failed to read rule table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rule table {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The browser collaborator could not complete an operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UiError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    #[error("Host UI rejected the operation: {0}")]
    Rejected(String),

    #[error("Window operation failed: {0}")]
    WindowFailed(String),
}

/// A matched label or client could not be applied to the open message.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApplyError {
    #[error("Field already populated")]
    AlreadyPopulated,

    #[error("Value {0:?} is not offered by the dropdown")]
    NotInDropdown(String),

    #[error("Value {0:?} was not accepted by the field")]
    NotAccepted(String),

    #[error("Nothing to apply")]
    Empty,

    #[error(transparent)]
    Unavailable(#[from] UiError),
}

/// Report store errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to open report store: {0}")]
    Open(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Operator notification errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("SMTP relay error: {0}")]
    Relay(String),

    #[error("Invalid address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP send failed: {0}")]
    Send(String),
}

/// Result type alias for mail-triage.
pub type Result<T> = std::result::Result<T, Error>;
