//! First-match rule evaluation.
//!
//! Rules are tried in table order; the first rule with any pattern found
//! in its field wins and evaluation stops. Deterministic and side-effect
//! free apart from debug logging.

use tracing::debug;

use crate::pipeline::rules::RuleTable;
use crate::pipeline::types::EmailFields;

/// Result of evaluating one table against one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub matched: bool,
    /// Index of the winning rule in the table.
    pub rule_index: Option<usize>,
    pub labels: Vec<String>,
    pub forward_address: Option<String>,
    pub close: bool,
    pub check_text: String,
}

impl Evaluation {
    fn no_match(check_text: &str) -> Self {
        Self {
            matched: false,
            rule_index: None,
            labels: Vec::new(),
            forward_address: None,
            close: false,
            check_text: check_text.to_string(),
        }
    }
}

/// Evaluate `fields` against `table`.
pub fn evaluate(fields: &EmailFields, table: &RuleTable) -> Evaluation {
    for (index, rule) in table.iter_rules().enumerate() {
        let Some(pattern) = rule.find_match(fields) else {
            continue;
        };

        let check_text = match &rule.outcome.check_text {
            Some(text) => text.clone(),
            None => format!("'{pattern}' found in {}", rule.field),
        };
        debug!(
            table = table.name(),
            rule = index,
            pattern,
            field = %rule.field,
            "Message matched rule"
        );
        return Evaluation {
            matched: true,
            rule_index: Some(index),
            labels: rule.outcome.labels.clone(),
            forward_address: rule.outcome.forward_address.clone(),
            close: rule.outcome.close,
            check_text,
        };
    }

    debug!(table = table.name(), "No rule matched");
    Evaluation::no_match(table.no_match_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rules::{Rule, RuleField, RuleOutcome};

    fn rule(field: RuleField, patterns: &[&str], labels: &[&str]) -> Rule {
        Rule::new(
            field,
            patterns.iter().map(|p| p.to_string()).collect(),
            RuleOutcome {
                labels: labels.iter().map(|l| l.to_string()).collect(),
                forward_address: None,
                close: false,
                check_text: None,
            },
        )
    }

    #[test]
    fn invoice_subject_matches_billing() {
        let mut billing = rule(RuleField::Subject, &["invoice"], &["Billing"]);
        billing.outcome.close = true;
        let table = RuleTable::new("labels", vec![billing]);
        let fields = EmailFields::new("Re: invoice #4", "", "", "");

        let result = evaluate(&fields, &table);
        assert!(result.matched);
        assert_eq!(result.labels, vec!["Billing"]);
        assert!(result.close);
        assert_eq!(result.forward_address, None);
        assert_eq!(result.rule_index, Some(0));
    }

    #[test]
    fn first_matching_rule_wins() {
        let table = RuleTable::new(
            "labels",
            vec![
                rule(RuleField::Body, &["car"], &["R1"]),
                rule(RuleField::Body, &["car", "damage"], &["R2"]),
            ],
        );
        let fields = EmailFields::new("", "My car has damage", "", "");

        let result = evaluate(&fields, &table);
        assert_eq!(result.labels, vec!["R1"]);
        assert_eq!(result.rule_index, Some(0));
    }

    #[test]
    fn later_rule_matches_when_earlier_field_differs() {
        let table = RuleTable::new(
            "labels",
            vec![
                rule(RuleField::Subject, &["damage"], &["Subject damage"]),
                rule(RuleField::Body, &["damage"], &["Body damage"]),
            ],
        );
        let fields = EmailFields::new("Question", "There is damage", "", "");

        let result = evaluate(&fields, &table);
        assert_eq!(result.labels, vec!["Body damage"]);
        assert_eq!(result.check_text, "'damage' found in body");
    }

    #[test]
    fn rule_check_text_overrides_generated() {
        let mut r = rule(RuleField::Sender, &["@fleet.example"], &["Fleet"]);
        r.outcome.check_text = Some("Fleet sender".into());
        let table = RuleTable::new("labels", vec![r]);
        let fields = EmailFields::new("", "", "ops@fleet.example", "");

        assert_eq!(evaluate(&fields, &table).check_text, "Fleet sender");
    }

    #[test]
    fn no_match_uses_table_text() {
        let table = RuleTable::new("labels", vec![rule(RuleField::Subject, &["x"], &["X"])])
            .with_no_match_text("No label rule matched");
        let fields = EmailFields::new("hello", "world", "", "");

        let result = evaluate(&fields, &table);
        assert!(!result.matched);
        assert!(result.labels.is_empty());
        assert!(!result.close);
        assert_eq!(result.rule_index, None);
        assert_eq!(result.check_text, "No label rule matched");
    }

    #[test]
    fn empty_table_never_matches() {
        let fields = EmailFields::new("anything", "at all", "a@b", "c@d");
        assert!(!evaluate(&fields, &RuleTable::empty("clients")).matched);
    }

    #[test]
    fn multiple_candidates_are_returned_unchosen() {
        let table = RuleTable::new(
            "labels",
            vec![rule(RuleField::Body, &["schade"], &["Damage", "Claims"])],
        );
        let fields = EmailFields::new("", "Schade aan auto", "", "");

        let result = evaluate(&fields, &table);
        assert_eq!(result.labels.len(), 2);
        assert!(result.labels.contains(&"Damage".to_string()));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let table = RuleTable::new(
            "labels",
            vec![
                rule(RuleField::Receiver, &["acme"], &["1243"]),
                rule(RuleField::Subject, &["lease"], &["9999"]),
            ],
        );
        let fields = EmailFields::new("lease contract", "", "", "support@acme.eu");
        assert_eq!(evaluate(&fields, &table), evaluate(&fields, &table));
    }
}
