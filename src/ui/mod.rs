//! Mail client UI seam.
//!
//! The classification session talks to the live mail client only through
//! [`MailUi`]. `MailPage` implements it on top of a generic browser
//! driver; `MailboxUi` serves a directory of message files; `PreviewUi`
//! accepts everything and is used for dry runs.

pub mod browser;
pub mod mailbox;
pub mod page;

use std::fmt;

use crate::error::{ApplyError, UiError};
use crate::pipeline::types::{EmailFields, ListEntry};

pub use browser::{Browser, KeyInput, Selector, WaitCondition};
pub use mailbox::{MailboxUi, read_mailbox};
pub use page::{Locators, MailPage};

/// Which tag field of an open message to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Label,
    Client,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Label => "label",
            Self::Client => "client",
        })
    }
}

/// Operations on one message of the mail client, in the order a
/// triage run uses them.
pub trait MailUi {
    /// Open the message behind `entry` and read its fields (full body).
    ///
    /// Fails only when the message cannot be opened; unreadable fields are empty.
    fn open_message(&mut self, entry: &ListEntry) -> Result<EmailFields, UiError>;

    /// Fill the label or client field of the open message.
    fn apply_field(&mut self, field: FieldKind, value: &str) -> Result<(), ApplyError>;

    /// Forward the open message; `Ok` only when the host confirmed the recipient.
    fn forward(&mut self, address: &str) -> Result<(), UiError>;

    /// Mark the open message as done, which also closes it.
    fn close_message(&mut self) -> Result<(), UiError>;

    /// Leave the open message without marking it done.
    fn leave_message(&mut self);
}

/// Dry-run UI: every application, forward and close is confirmed.
#[derive(Debug, Default)]
pub struct PreviewUi {
    fields: EmailFields,
    applied: Vec<(FieldKind, String)>,
}

impl PreviewUi {
    /// Preview UI serving `fields` as the open message.
    pub fn new(fields: EmailFields) -> Self {
        Self {
            fields,
            applied: Vec::new(),
        }
    }

    /// Values applied so far.
    pub fn applied(&self) -> &[(FieldKind, String)] {
        &self.applied
    }
}

impl MailUi for PreviewUi {
    fn open_message(&mut self, _entry: &ListEntry) -> Result<EmailFields, UiError> {
        Ok(self.fields.clone())
    }

    fn apply_field(&mut self, field: FieldKind, value: &str) -> Result<(), ApplyError> {
        if self.applied.iter().any(|(kind, _)| *kind == field) {
            return Err(ApplyError::AlreadyPopulated);
        }
        self.applied.push((field, value.to_string()));
        Ok(())
    }

    fn forward(&mut self, _address: &str) -> Result<(), UiError> {
        Ok(())
    }

    fn close_message(&mut self) -> Result<(), UiError> {
        Ok(())
    }

    fn leave_message(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_records_applied_fields() {
        let mut ui = PreviewUi::new(EmailFields::new("s", "b", "a", "r"));
        ui.apply_field(FieldKind::Label, "Billing").unwrap();
        ui.apply_field(FieldKind::Client, "1243").unwrap();
        assert_eq!(ui.applied().len(), 2);
        assert_eq!(ui.applied()[0], (FieldKind::Label, "Billing".to_string()));
    }

    #[test]
    fn preview_rejects_second_value_for_same_field() {
        let mut ui = PreviewUi::default();
        ui.apply_field(FieldKind::Label, "A").unwrap();
        assert!(matches!(
            ui.apply_field(FieldKind::Label, "B"),
            Err(ApplyError::AlreadyPopulated)
        ));
    }

    #[test]
    fn preview_serves_its_fields() {
        let fields = EmailFields::new("s", "b", "a", "r");
        let mut ui = PreviewUi::new(fields.clone());
        assert_eq!(ui.open_message(&ListEntry::default()).unwrap(), fields);
    }

    #[test]
    fn field_kind_display() {
        assert_eq!(FieldKind::Label.to_string(), "label");
        assert_eq!(FieldKind::Client.to_string(), "client");
    }
}
