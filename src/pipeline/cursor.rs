//! Resume point across runs.
//!
//! The list view is newest first. Processing stops at the first message
//! not newer than the last one recorded in the report.

use serde::{Deserialize, Serialize};

/// Last processed message, read from the previous report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeMarker {
    pub last_subject: Option<String>,
    /// Sortable date text (ISO-like).
    pub last_date: Option<String>,
}

impl ResumeMarker {
    pub fn new(last_subject: impl Into<String>, last_date: impl Into<String>) -> Self {
        Self {
            last_subject: Some(last_subject.into()),
            last_date: Some(last_date.into()),
        }
    }

    /// Marker for a first run: never stops.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.date().is_none()
    }

    fn date(&self) -> Option<&str> {
        self.last_date.as_deref().filter(|d| !d.trim().is_empty())
    }
}

/// True when `candidate_date` is at or before the marker's date.
///
/// Plain lexical comparison; stateless, safe to call per element.
pub fn should_stop(candidate_date: &str, marker: &ResumeMarker) -> bool {
    match marker.date() {
        Some(last) => candidate_date <= last,
        None => false,
    }
}
