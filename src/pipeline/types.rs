//! Shared types for the triage pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Email fields ────────────────────────────────────────────────────

/// Classifiable content of one message.
///
/// Built by the UI collaborator (or from an `.eml` file) and consumed
/// read-only by the segmenter and the rule evaluator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailFields {
    pub subject: String,
    pub body: String,
    /// Sender address.
    pub sender: String,
    /// Receiver address.
    pub receiver: String,
}

impl EmailFields {
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            sender: sender.into(),
            receiver: receiver.into(),
        }
    }

    /// Copy of these fields with `body` replaced by the current message.
    pub fn with_body(&self, body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..self.clone()
        }
    }
}

// ── Decision ────────────────────────────────────────────────────────

/// What happened to the forward step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "address", rename_all = "snake_case")]
pub enum ForwardOutcome {
    /// Forwarded and confirmed by the host UI.
    Forwarded(String),
    /// A gate before forwarding was not passed.
    NotForwarded,
    /// Forward was attempted but not confirmed.
    Failed,
}

impl ForwardOutcome {
    /// Report text: the address, `"Not forwarded"` or `"Failed to forward"`.
    pub fn as_report_text(&self) -> &str {
        match self {
            Self::Forwarded(address) => address,
            Self::NotForwarded => "Not forwarded",
            Self::Failed => "Failed to forward",
        }
    }
}

impl fmt::Display for ForwardOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_report_text())
    }
}

/// Full classification result for one email. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether a label rule matched, regardless of whether it was applied.
    pub label_matched: bool,
    /// Label that was successfully applied.
    pub label: Option<String>,
    /// Client code that was successfully applied. Only set when `label` is.
    pub client: Option<String>,
    pub labels_check_text: String,
    pub clients_check_text: String,
    pub forward: ForwardOutcome,
    pub closed: bool,
}

impl Decision {
    /// Status line used in the report.
    pub fn status(&self) -> ReportStatus {
        if self.label.is_some() {
            ReportStatus::LabelAdded
        } else {
            ReportStatus::LabelNotSet
        }
    }
}

// ── List view ───────────────────────────────────────────────────────

/// One row of the mail client's message list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub subject: String,
    /// Link of the message in the list view (`...#mail=<id>`).
    pub url: String,
    pub sender: String,
    /// Received date as displayed; sortable text.
    pub date: String,
    /// Label already shown in the list, empty when unlabeled.
    pub label: String,
}

// ── Report ──────────────────────────────────────────────────────────

/// Human-readable status of a processed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportStatus {
    LabelAdded,
    LabelNotSet,
    LabelsSetBefore,
    Unreadable,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LabelAdded => "Label was added",
            Self::LabelNotSet => "Couldn't set the label",
            Self::LabelsSetBefore => "Labels were set before",
            Self::Unreadable => "Couldn't open the message",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One report row. Every processed message yields exactly one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub subject: String,
    pub sender: String,
    pub date: String,
    pub label: String,
    pub status: String,
    pub email_body: String,
    pub check: String,
    pub url: String,
    pub client: String,
    pub clients_check_text: String,
    pub forward: String,
    pub email_closed: String,
}

impl ReportRow {
    /// Row for a message whose label was already set in the list view.
    pub fn labelled_before(entry: &ListEntry) -> Self {
        Self {
            subject: entry.subject.clone(),
            sender: entry.sender.clone(),
            date: entry.date.clone(),
            label: entry.label.clone(),
            status: ReportStatus::LabelsSetBefore.to_string(),
            url: entry.url.clone(),
            ..Self::default()
        }
    }

    /// Row for a message that could not be opened or read.
    pub fn unreadable(entry: &ListEntry, url: &str) -> Self {
        Self {
            subject: entry.subject.clone(),
            sender: entry.sender.clone(),
            date: entry.date.clone(),
            status: ReportStatus::Unreadable.to_string(),
            url: url.to_string(),
            forward: ForwardOutcome::NotForwarded.to_string(),
            email_closed: "No".into(),
            ..Self::default()
        }
    }

    /// Row for a classified message.
    pub fn classified(
        entry: &ListEntry,
        fields: &EmailFields,
        decision: &Decision,
        url: &str,
    ) -> Self {
        let subject = if fields.subject.is_empty() {
            entry.subject.clone()
        } else {
            fields.subject.clone()
        };
        Self {
            subject,
            sender: entry.sender.clone(),
            date: entry.date.clone(),
            label: decision.label.clone().unwrap_or_default(),
            status: decision.status().to_string(),
            email_body: fields.body.clone(),
            check: if decision.label.is_some() {
                decision.labels_check_text.clone()
            } else {
                String::new()
            },
            url: url.to_string(),
            client: decision.client.clone().unwrap_or_default(),
            clients_check_text: decision.clients_check_text.clone(),
            forward: decision.forward.to_string(),
            email_closed: if decision.closed { "Yes" } else { "No" }.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ListEntry {
        ListEntry {
            subject: "Invoice 4".into(),
            url: "https://mail.example.com/messages#mail=155171".into(),
            sender: "Alice".into(),
            date: "2024-05-10 09:12".into(),
            label: String::new(),
        }
    }

    #[test]
    fn forward_outcome_report_text() {
        assert_eq!(
            ForwardOutcome::Forwarded("ops@example.com".into()).to_string(),
            "ops@example.com"
        );
        assert_eq!(ForwardOutcome::NotForwarded.to_string(), "Not forwarded");
        assert_eq!(ForwardOutcome::Failed.to_string(), "Failed to forward");
    }

    #[test]
    fn forward_outcome_serialization() {
        let json = serde_json::to_value(ForwardOutcome::Forwarded("a@b.c".into())).unwrap();
        assert_eq!(json["outcome"], "forwarded");
        assert_eq!(json["address"], "a@b.c");

        let json = serde_json::to_value(ForwardOutcome::NotForwarded).unwrap();
        assert_eq!(json["outcome"], "not_forwarded");
    }

    #[test]
    fn decision_status_follows_applied_label() {
        let mut decision = Decision {
            label_matched: true,
            label: None,
            client: None,
            labels_check_text: "matched".into(),
            clients_check_text: String::new(),
            forward: ForwardOutcome::NotForwarded,
            closed: false,
        };
        assert_eq!(decision.status(), ReportStatus::LabelNotSet);

        decision.label = Some("Billing".into());
        assert_eq!(decision.status(), ReportStatus::LabelAdded);
    }

    #[test]
    fn labelled_before_row_keeps_list_label() {
        let mut e = entry();
        e.label = "Damage".into();
        let row = ReportRow::labelled_before(&e);
        assert_eq!(row.label, "Damage");
        assert_eq!(row.status, "Labels were set before");
        assert_eq!(row.url, e.url);
        assert!(row.email_body.is_empty());
    }

    #[test]
    fn classified_row_blanks_check_when_label_missing() {
        let fields = EmailFields::new("", "body", "a@x.com", "b@x.com");
        let decision = Decision {
            label_matched: true,
            label: None,
            client: None,
            labels_check_text: "'invoice' found in subject".into(),
            clients_check_text: "skipped".into(),
            forward: ForwardOutcome::NotForwarded,
            closed: false,
        };
        let row = ReportRow::classified(&entry(), &fields, &decision, "u");
        assert_eq!(row.subject, "Invoice 4");
        assert_eq!(row.status, "Couldn't set the label");
        assert!(row.check.is_empty());
        assert_eq!(row.email_closed, "No");
        assert_eq!(row.forward, "Not forwarded");
    }

    #[test]
    fn with_body_replaces_only_body() {
        let fields = EmailFields::new("s", "long body", "a", "b");
        let short = fields.with_body("long");
        assert_eq!(short.body, "long");
        assert_eq!(short.subject, "s");
        assert_eq!(short.receiver, "b");
    }
}
