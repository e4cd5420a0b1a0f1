//! Configuration types, read from `TRIAGE_*` environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::pipeline::rules::{FirstLabel, LabelPicker, RandomLabel};
use crate::pipeline::segmenter::{
    DEFAULT_CONTINUATION_MARKERS, DEFAULT_SENDER_MARKERS, Segmenter,
};

/// How one label is chosen when a rule names several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LabelPick {
    #[default]
    Random,
    First,
}

impl LabelPick {
    pub fn picker(self) -> Box<dyn LabelPicker> {
        match self {
            Self::Random => Box::new(RandomLabel),
            Self::First => Box::new(FirstLabel),
        }
    }
}

impl FromStr for LabelPick {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "first" => Ok(Self::First),
            other => Err(ConfigError::InvalidValue {
                key: "TRIAGE_LABEL_PICK".into(),
                message: format!("expected 'random' or 'first', got '{other}'"),
            }),
        }
    }
}

/// Marker lists for the segmenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmenterConfig {
    pub sender_markers: Vec<String>,
    pub continuation_markers: Vec<String>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            sender_markers: DEFAULT_SENDER_MARKERS.iter().map(|s| s.to_string()).collect(),
            continuation_markers: DEFAULT_CONTINUATION_MARKERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl SegmenterConfig {
    pub fn segmenter(&self) -> Segmenter {
        Segmenter::new(
            self.sender_markers.clone(),
            self.continuation_markers.clone(),
        )
    }
}

/// SMTP settings for operator notifications.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

impl NotifyConfig {
    /// Returns `None` when `TRIAGE_SMTP_HOST` is unset.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let smtp_host = lookup("TRIAGE_SMTP_HOST").filter(|h| !h.trim().is_empty())?;

        let smtp_port: u16 = lookup("TRIAGE_SMTP_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);

        let username = lookup("TRIAGE_SMTP_USERNAME").unwrap_or_default();
        let password = SecretString::from(lookup("TRIAGE_SMTP_PASSWORD").unwrap_or_default());
        let from_address = lookup("TRIAGE_SMTP_FROM").unwrap_or_else(|| username.clone());

        Some(Self {
            smtp_host,
            smtp_port,
            username,
            password,
            from_address,
        })
    }
}

/// Triage configuration.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Label rule table path.
    pub label_rules: Option<PathBuf>,
    /// Client rule table path.
    pub client_rules: Option<PathBuf>,
    pub report_db: PathBuf,
    pub log_dir: PathBuf,
    pub segmenter: SegmenterConfig,
    pub label_pick: LabelPick,
    /// Notified when a message cannot be opened.
    pub operator_address: Option<String>,
    /// `None` means notifications only go to the log.
    pub notify: Option<NotifyConfig>,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            label_rules: None,
            client_rules: None,
            report_db: PathBuf::from("./data/triage-report.db"),
            log_dir: PathBuf::from("./logs"),
            segmenter: SegmenterConfig::default(),
            label_pick: LabelPick::default(),
            operator_address: None,
            notify: None,
        }
    }
}

impl TriageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let label_pick = match lookup("TRIAGE_LABEL_PICK") {
            Some(value) => value.parse()?,
            None => defaults.label_pick,
        };

        let segmenter = SegmenterConfig {
            sender_markers: lookup("TRIAGE_SENDER_MARKERS")
                .map(|s| split_markers(&s))
                .unwrap_or(defaults.segmenter.sender_markers),
            continuation_markers: lookup("TRIAGE_CONTINUATION_MARKERS")
                .map(|s| split_markers(&s))
                .unwrap_or(defaults.segmenter.continuation_markers),
        };

        Ok(Self {
            label_rules: lookup("TRIAGE_LABEL_RULES").map(PathBuf::from),
            client_rules: lookup("TRIAGE_CLIENT_RULES").map(PathBuf::from),
            report_db: lookup("TRIAGE_REPORT_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_db),
            log_dir: lookup("TRIAGE_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            segmenter,
            label_pick,
            operator_address: lookup("TRIAGE_OPERATOR_ADDRESS").filter(|a| !a.trim().is_empty()),
            notify: NotifyConfig::from_lookup(&lookup),
        })
    }
}

/// Split a `|`-separated marker list, dropping empty entries.
fn split_markers(value: &str) -> Vec<String> {
    value
        .split('|')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
        .collect()
}
