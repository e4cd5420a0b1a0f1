//! One triage pass over the message list.
//!
//! For each list entry, newest first:
//! 1. Stop at the resume marker.
//! 2. Already labeled → report row, no classification.
//! 3. Open, segment, classify, leave or close → report row. A message
//!    whose body cannot be read is still classified on its other fields.
//!
//! Every entry that is reached produces exactly one report row.

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::notify::Notifier;
use crate::pipeline::cursor::{ResumeMarker, should_stop};
use crate::pipeline::segmenter::Segmenter;
use crate::pipeline::session::ClassificationSession;
use crate::pipeline::types::{ListEntry, ReportRow};
use crate::ui::MailUi;
use crate::ui::page::message_url;

/// Outcome of a triage pass.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub rows: Vec<ReportRow>,
    /// Whether the pass ended at the resume marker.
    pub stopped: bool,
}

/// Drives classification over list entries.
pub struct TriageRun<'a> {
    session: &'a ClassificationSession,
    segmenter: &'a Segmenter,
    notifier: &'a dyn Notifier,
    operator: Option<String>,
}

impl<'a> TriageRun<'a> {
    pub fn new(
        session: &'a ClassificationSession,
        segmenter: &'a Segmenter,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            session,
            segmenter,
            notifier,
            operator: None,
        }
    }

    /// Address notified when a message cannot be processed.
    pub fn with_operator(mut self, address: impl Into<String>) -> Self {
        self.operator = Some(address.into());
        self
    }

    pub fn process(
        &self,
        entries: &[ListEntry],
        marker: &ResumeMarker,
        ui: &mut dyn MailUi,
    ) -> RunReport {
        let run_id = Uuid::new_v4();
        let mut rows = Vec::with_capacity(entries.len());
        let mut stopped = false;

        for entry in entries {
            if should_stop(&entry.date, marker) {
                info!(
                    date = %entry.date,
                    last_date = marker.last_date.as_deref().unwrap_or(""),
                    "Stopped at last processed date"
                );
                stopped = true;
                break;
            }

            if !entry.label.is_empty() {
                rows.push(ReportRow::labelled_before(entry));
                continue;
            }

            rows.push(self.process_entry(entry, ui));
        }

        info!(run_id = %run_id, rows = rows.len(), stopped, "Triage pass finished");
        RunReport {
            run_id,
            rows,
            stopped,
        }
    }

    fn process_entry(&self, entry: &ListEntry, ui: &mut dyn MailUi) -> ReportRow {
        let url = message_url(&entry.url);

        let fields = match ui.open_message(entry) {
            Ok(fields) => fields,
            Err(e) => {
                error!(subject = %entry.subject, url = %url, error = %e, "Couldn't open message");
                self.alert(&format!(
                    "Couldn't open message {:?} ({}) received {}: {e}",
                    entry.subject, url, entry.date
                ));
                return ReportRow::unreadable(entry, &url);
            }
        };

        if fields.body.trim().is_empty() {
            warn!(subject = %fields.subject, url = %url, "Message body is empty or unreadable");
            self.alert(&format!(
                "Couldn't read the body of message {:?} ({}) received {}",
                entry.subject, url, entry.date
            ));
        }

        let current = fields.with_body(self.segmenter.extract(&fields.body));
        let decision = self.session.classify(&current, ui);
        if !decision.closed {
            ui.leave_message();
        }

        info!(
            subject = %current.subject,
            sender = %entry.sender,
            date = %entry.date,
            label = decision.label.as_deref().unwrap_or(""),
            "Message processed"
        );
        ReportRow::classified(entry, &current, &decision, &url)
    }

    fn alert(&self, message: &str) {
        let Some(address) = self.operator.as_deref() else {
            return;
        };
        if let Err(e) = self.notifier.notify(address, message) {
            warn!(error = %e, "Failed to notify operator");
        }
    }
}
