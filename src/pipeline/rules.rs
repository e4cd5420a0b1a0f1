//! Rule tables for label and client classification.
//!
//! A table is an ordered list of rules loaded from a JSON export of the
//! rule spreadsheet, one row per rule. Row order is priority order.
//! Malformed rows are dropped with a warning instead of failing the load.
//!
//! Row format:
//!
//! ```json
//! { "field": "subject", "patterns": "invoice;factuur", "labels": "Billing",
//!   "forward": "billing@example.com", "close": "yes", "check_text": "Invoice" }
//! ```

use std::fmt;
use std::path::Path;

use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::RuleLoadError;
use crate::pipeline::types::EmailFields;

/// Separator for multi-valued cells given as a single string.
const CELL_SEPARATOR: char = ';';

/// Check text used when no rule matched and the table sets none.
pub const DEFAULT_NO_MATCH_TEXT: &str = "No rule matched";

/// Which message field a rule matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleField {
    Subject,
    Body,
    Sender,
    Receiver,
}

impl RuleField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "subject" => Some(Self::Subject),
            "body" => Some(Self::Body),
            "sender" => Some(Self::Sender),
            "receiver" => Some(Self::Receiver),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Body => "body",
            Self::Sender => "sender",
            Self::Receiver => "receiver",
        }
    }

    /// The value of this field in `fields`.
    pub fn select<'a>(&self, fields: &'a EmailFields) -> &'a str {
        match self {
            Self::Subject => &fields.subject,
            Self::Body => &fields.body,
            Self::Sender => &fields.sender,
            Self::Receiver => &fields.receiver,
        }
    }
}

impl fmt::Display for RuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a matching rule decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    /// Candidate labels (or client codes). Never empty.
    pub labels: Vec<String>,
    pub forward_address: Option<String>,
    pub close: bool,
    pub check_text: Option<String>,
}

/// A single classification rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Patterns as written in the table.
    pub patterns: Vec<String>,
    /// Lowercased patterns used for matching.
    needles: Vec<String>,
    pub field: RuleField,
    pub outcome: RuleOutcome,
}

impl Rule {
    pub fn new(field: RuleField, patterns: Vec<String>, outcome: RuleOutcome) -> Self {
        let needles = patterns.iter().map(|p| p.to_lowercase()).collect();
        Self {
            patterns,
            needles,
            field,
            outcome,
        }
    }

    /// First pattern occurring in the rule's field, case-insensitively.
    pub fn find_match(&self, fields: &EmailFields) -> Option<&str> {
        let haystack = self.field.select(fields).to_lowercase();
        self.needles
            .iter()
            .position(|needle| haystack.contains(needle.as_str()))
            .map(|i| self.patterns[i].as_str())
    }
}

/// A rule row that was skipped while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRow {
    /// Zero-based row index in the source.
    pub index: usize,
    pub reason: String,
}

/// Ordered rule set plus the no-match check text.
#[derive(Debug, Clone)]
pub struct RuleTable {
    name: String,
    rules: Vec<Rule>,
    no_match_text: String,
    dropped: Vec<DroppedRow>,
}

impl RuleTable {
    /// Build a table from already-constructed rules.
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            rules,
            no_match_text: DEFAULT_NO_MATCH_TEXT.to_string(),
            dropped: Vec::new(),
        }
    }

    /// Empty table (matches nothing).
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn with_no_match_text(mut self, text: impl Into<String>) -> Self {
        self.no_match_text = text.into();
        self
    }

    /// Load a table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuleLoadError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RuleLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "rules".to_string());
        Self::from_json(&name, &raw).map_err(|source| RuleLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a table from JSON text.
    ///
    /// Fails only when the document itself is not a rule table; bad rows
    /// are dropped and listed in [`RuleTable::dropped`].
    pub fn from_json(name: &str, json: &str) -> Result<Self, serde_json::Error> {
        let document: TableDocument = serde_json::from_str(json)?;
        let (rows, no_match_text) = match document {
            TableDocument::Rows(rows) => (rows, None),
            TableDocument::Table {
                rules,
                no_match_text,
            } => (rules, no_match_text),
        };

        let mut rules = Vec::with_capacity(rows.len());
        let mut dropped = Vec::new();
        for (index, row) in rows.into_iter().enumerate() {
            match parse_row(row) {
                Ok(rule) => rules.push(rule),
                Err(reason) => {
                    warn!(table = name, row = index, %reason, "Dropping malformed rule row");
                    dropped.push(DroppedRow { index, reason });
                }
            }
        }

        debug!(table = name, rules = rules.len(), dropped = dropped.len(), "Rule table loaded");
        Ok(Self {
            name: name.to_string(),
            rules,
            no_match_text: no_match_text.unwrap_or_else(|| DEFAULT_NO_MATCH_TEXT.to_string()),
            dropped,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rules in priority order.
    pub fn iter_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn no_match_text(&self) -> &str {
        &self.no_match_text
    }

    /// Rows skipped during loading.
    pub fn dropped(&self) -> &[DroppedRow] {
        &self.dropped
    }
}

// ── JSON rows ───────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum TableDocument {
    Rows(Vec<serde_json::Value>),
    Table {
        rules: Vec<serde_json::Value>,
        #[serde(default)]
        no_match_text: Option<String>,
    },
}

/// A cell that may hold one `;`-separated string or a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum Cell {
    One(String),
    Many(Vec<String>),
}

impl Cell {
    fn into_values(self) -> Vec<String> {
        let values: Vec<String> = match self {
            Self::One(s) => s.split(CELL_SEPARATOR).map(str::to_string).collect(),
            Self::Many(v) => v,
        };
        values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => s.trim().eq_ignore_ascii_case("yes"),
        }
    }
}

#[derive(Deserialize)]
struct RawRow {
    field: Option<String>,
    patterns: Option<Cell>,
    labels: Option<Cell>,
    #[serde(default)]
    forward: Option<String>,
    #[serde(default)]
    close: Option<Flag>,
    #[serde(default)]
    check_text: Option<String>,
}

fn parse_row(value: serde_json::Value) -> Result<Rule, String> {
    let row: RawRow = serde_json::from_value(value).map_err(|e| format!("invalid row: {e}"))?;

    let field_name = row.field.ok_or("missing field")?;
    let field = RuleField::parse(&field_name).ok_or_else(|| format!("unknown field {field_name:?}"))?;

    let patterns = row.patterns.map(Cell::into_values).unwrap_or_default();
    if patterns.is_empty() {
        return Err("missing patterns".into());
    }

    let labels = row.labels.map(Cell::into_values).unwrap_or_default();
    if labels.is_empty() {
        return Err("missing labels".into());
    }

    let forward_address = row
        .forward
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());
    let check_text = row
        .check_text
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    Ok(Rule::new(
        field,
        patterns,
        RuleOutcome {
            labels,
            forward_address,
            close: row.close.is_some_and(|c| c.is_set()),
            check_text,
        },
    ))
}

// ── Label selection ─────────────────────────────────────────────────

/// Chooses one label when a rule offers several equally valid candidates.
pub trait LabelPicker: Send + Sync {
    fn pick<'a>(&self, candidates: &'a [String]) -> Option<&'a str>;
}

/// Always the first candidate. Deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstLabel;

impl LabelPicker for FirstLabel {
    fn pick<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        candidates.first().map(String::as_str)
    }
}

/// Uniformly random candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomLabel;

impl LabelPicker for RandomLabel {
    fn pick<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        candidates
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"{
        "no_match_text": "No label rule matched",
        "rules": [
            {"field": "subject", "patterns": "invoice; factuur", "labels": "Billing",
             "close": "Yes", "check_text": "Invoice in subject"},
            {"field": "body", "patterns": ["damage", "schade"], "labels": ["Damage", "Claims"],
             "forward": "claims@example.com"},
            {"field": "sender", "patterns": "fleet@", "labels": "Fleet", "close": true}
        ]
    }"#;

    #[test]
    fn loads_rows_in_order() {
        let table = RuleTable::from_json("labels", TABLE).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.no_match_text(), "No label rule matched");

        let fields: Vec<RuleField> = table.iter_rules().map(|r| r.field).collect();
        assert_eq!(
            fields,
            vec![RuleField::Subject, RuleField::Body, RuleField::Sender]
        );
    }

    #[test]
    fn splits_single_string_cells() {
        let table = RuleTable::from_json("labels", TABLE).unwrap();
        let first = table.iter_rules().next().unwrap();
        assert_eq!(first.patterns, vec!["invoice", "factuur"]);
        assert_eq!(first.outcome.labels, vec!["Billing"]);
        assert!(first.outcome.close);
        assert_eq!(first.outcome.check_text.as_deref(), Some("Invoice in subject"));
    }

    #[test]
    fn parses_close_and_forward() {
        let table = RuleTable::from_json("labels", TABLE).unwrap();
        let rules: Vec<&Rule> = table.iter_rules().collect();
        assert!(!rules[1].outcome.close);
        assert_eq!(
            rules[1].outcome.forward_address.as_deref(),
            Some("claims@example.com")
        );
        assert!(rules[2].outcome.close);
    }

    #[test]
    fn bare_array_document() {
        let table = RuleTable::from_json(
            "clients",
            r#"[{"field": "receiver", "patterns": "acme", "labels": "1243"}]"#,
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.no_match_text(), DEFAULT_NO_MATCH_TEXT);
    }

    #[test]
    fn drops_malformed_rows() {
        let table = RuleTable::from_json(
            "labels",
            r#"[
                {"field": "subject", "patterns": "a", "labels": "A"},
                {"field": "subject", "patterns": "b"},
                {"field": "headers", "patterns": "c", "labels": "C"},
                {"patterns": "d", "labels": "D"},
                {"field": "body", "patterns": " ; ", "labels": "E"},
                {"field": "body", "patterns": "f", "labels": ""},
                "not an object",
                {"field": "body", "patterns": "g", "labels": "G"}
            ]"#,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        let indices: Vec<usize> = table.dropped().iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(table.dropped()[0].reason, "missing labels");
        assert!(table.dropped()[1].reason.contains("headers"));
    }

    #[test]
    fn non_table_document_is_an_error() {
        assert!(RuleTable::from_json("labels", r#"{"foo": 1}"#).is_err());
        assert!(RuleTable::from_json("labels", "not json").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = RuleTable::load("/nonexistent/labels.json").unwrap_err();
        assert!(matches!(err, RuleLoadError::Io { .. }));
    }

    #[test]
    fn load_from_file_uses_stem_as_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, TABLE).unwrap();

        let table = RuleTable::load(&path).unwrap();
        assert_eq!(table.name(), "labels");
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn load_reports_parse_error_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{").unwrap();

        let err = RuleTable::load(&path).unwrap_err();
        match err {
            RuleLoadError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("Expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn find_match_is_case_insensitive() {
        let rule = Rule::new(
            RuleField::Subject,
            vec!["Invoice".into()],
            RuleOutcome {
                labels: vec!["Billing".into()],
                forward_address: None,
                close: false,
                check_text: None,
            },
        );
        let fields = EmailFields::new("RE: INVOICE #4", "", "", "");
        assert_eq!(rule.find_match(&fields), Some("Invoice"));

        let other = EmailFields::new("Hello", "invoice in body", "", "");
        assert_eq!(rule.find_match(&other), None);
    }

    #[test]
    fn rule_field_parse_and_select() {
        assert_eq!(RuleField::parse(" Sender "), Some(RuleField::Sender));
        assert_eq!(RuleField::parse("cc"), None);

        let fields = EmailFields::new("s", "b", "from@x", "to@x");
        assert_eq!(RuleField::Receiver.select(&fields), "to@x");
        assert_eq!(RuleField::Body.to_string(), "body");
    }

    #[test]
    fn first_label_picker_is_deterministic() {
        let candidates = vec!["Damage".to_string(), "Claims".to_string()];
        assert_eq!(FirstLabel.pick(&candidates), Some("Damage"));
        assert_eq!(FirstLabel.pick(&[]), None);
    }

    #[test]
    fn random_label_picker_stays_within_candidates() {
        let candidates = vec!["Damage".to_string(), "Claims".to_string()];
        for _ in 0..20 {
            let picked = RandomLabel.pick(&candidates).unwrap();
            assert!(candidates.iter().any(|c| c == picked));
        }
        assert_eq!(RandomLabel.pick(&[]), None);
    }
}
