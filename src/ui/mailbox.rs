//! Directory of `.eml` files served as a mail client.
//!
//! Used for offline runs: every file is one list entry, newest first.
//! Applications are accepted like [`PreviewUi`] does for the open message.

use std::path::Path;

use tracing::warn;

use crate::eml;
use crate::error::{ApplyError, Error, UiError};
use crate::pipeline::types::{EmailFields, ListEntry};
use crate::ui::{FieldKind, MailUi, PreviewUi};

/// Read every `.eml` file of `dir` into list entries, newest first.
///
/// Unparsable files are skipped with a warning.
pub fn read_mailbox(dir: &Path) -> Result<Vec<ListEntry>, Error> {
    let read_err = |e: std::io::Error| Error::Message(format!("{}: {e}", dir.display()));

    let mut entries = Vec::new();
    for item in std::fs::read_dir(dir).map_err(read_err)? {
        let path = item.map_err(read_err)?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("eml") {
            continue;
        }
        let raw = std::fs::read(&path).map_err(read_err)?;
        match eml::parse_list_entry(&raw, &path.to_string_lossy()) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable message file"),
        }
    }

    entries.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.url.cmp(&b.url)));
    Ok(entries)
}

/// [`MailUi`] over message files; `ListEntry::url` is the file path.
#[derive(Debug, Default)]
pub struct MailboxUi {
    open: Option<PreviewUi>,
}

impl MailboxUi {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&mut self) -> Result<&mut PreviewUi, UiError> {
        self.open
            .as_mut()
            .ok_or_else(|| UiError::WindowFailed("no message is open".into()))
    }
}

impl MailUi for MailboxUi {
    fn open_message(&mut self, entry: &ListEntry) -> Result<EmailFields, UiError> {
        let raw = std::fs::read(&entry.url)
            .map_err(|e| UiError::ElementNotFound(format!("{}: {e}", entry.url)))?;
        let fields =
            eml::parse_message(&raw).map_err(|e| UiError::Rejected(e.to_string()))?;
        self.open = Some(PreviewUi::new(fields.clone()));
        Ok(fields)
    }

    fn apply_field(&mut self, field: FieldKind, value: &str) -> Result<(), ApplyError> {
        self.current()?.apply_field(field, value)
    }

    fn forward(&mut self, address: &str) -> Result<(), UiError> {
        self.current()?.forward(address)
    }

    fn close_message(&mut self) -> Result<(), UiError> {
        self.current()?.close_message()?;
        self.open = None;
        Ok(())
    }

    fn leave_message(&mut self) {
        self.open = None;
    }
}
