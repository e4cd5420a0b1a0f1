//! Per-message classification with cascading gates.
//!
//! label applied ⇒ client evaluated ⇒ forward ⇒ close. Each stage only
//! runs when the previous one succeeded, and every failure becomes part
//! of the `Decision` instead of an error.

use tracing::{debug, info, warn};

use crate::pipeline::evaluator::{Evaluation, evaluate};
use crate::pipeline::rules::{LabelPicker, RandomLabel, RuleTable};
use crate::pipeline::types::{Decision, EmailFields, ForwardOutcome};
use crate::ui::{FieldKind, MailUi};

/// Client check text when the label gate was not passed.
pub const CLIENT_SKIPPED_TEXT: &str = "Client rules skipped: no label was applied";

/// Classifies messages against a label table and a client table.
pub struct ClassificationSession {
    label_table: RuleTable,
    client_table: RuleTable,
    picker: Box<dyn LabelPicker>,
}

impl ClassificationSession {
    /// Session choosing randomly among equivalent candidate labels.
    pub fn new(label_table: RuleTable, client_table: RuleTable) -> Self {
        Self::with_picker(label_table, client_table, Box::new(RandomLabel))
    }

    pub fn with_picker(
        label_table: RuleTable,
        client_table: RuleTable,
        picker: Box<dyn LabelPicker>,
    ) -> Self {
        Self {
            label_table,
            client_table,
            picker,
        }
    }

    pub fn label_table(&self) -> &RuleTable {
        &self.label_table
    }

    pub fn client_table(&self) -> &RuleTable {
        &self.client_table
    }

    /// Classify one open message and apply the outcome through `ui`.
    pub fn classify(&self, fields: &EmailFields, ui: &mut dyn MailUi) -> Decision {
        let label_eval = evaluate(fields, &self.label_table);
        if !label_eval.matched {
            return Decision {
                label_matched: false,
                label: None,
                client: None,
                labels_check_text: label_eval.check_text,
                clients_check_text: CLIENT_SKIPPED_TEXT.to_string(),
                forward: ForwardOutcome::NotForwarded,
                closed: false,
            };
        }

        let label = self.apply(FieldKind::Label, &label_eval, ui);

        let (client, clients_check_text) = match &label {
            Some(_) => {
                let client_eval = evaluate(fields, &self.client_table);
                let client = if client_eval.matched {
                    self.apply(FieldKind::Client, &client_eval, ui)
                } else {
                    None
                };
                (client, client_eval.check_text)
            }
            None => (None, CLIENT_SKIPPED_TEXT.to_string()),
        };

        let both_applied = label.is_some() && client.is_some();

        let forward = match label_eval.forward_address.as_deref() {
            Some(address) if both_applied && address.contains('@') => {
                match ui.forward(address) {
                    Ok(()) => ForwardOutcome::Forwarded(address.to_string()),
                    Err(e) => {
                        warn!(address, error = %e, "Forward was not confirmed");
                        ForwardOutcome::Failed
                    }
                }
            }
            _ => ForwardOutcome::NotForwarded,
        };

        let closed = if label_eval.close && both_applied {
            match ui.close_message() {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Could not close message");
                    false
                }
            }
        } else {
            false
        };

        debug!(
            label = label.as_deref().unwrap_or(""),
            client = client.as_deref().unwrap_or(""),
            %forward,
            closed,
            "Message classified"
        );

        Decision {
            label_matched: true,
            label,
            client,
            labels_check_text: label_eval.check_text,
            clients_check_text,
            forward,
            closed,
        }
    }

    /// Pick a candidate and apply it. `None` on any failure.
    fn apply(&self, field: FieldKind, eval: &Evaluation, ui: &mut dyn MailUi) -> Option<String> {
        let value = self.picker.pick(&eval.labels)?;
        match ui.apply_field(field, value) {
            Ok(()) => {
                info!(%field, value, "Applied classification");
                Some(value.trim().to_string())
            }
            Err(e) => {
                warn!(%field, value, error = %e, "Couldn't apply classification");
                None
            }
        }
    }
}
