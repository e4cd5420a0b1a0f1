//! Email triage pipeline.
//!
//! Every message taken from the list view flows through:
//! 1. `cursor::should_stop()`: stop at the last message already reported
//! 2. `segmenter::extract_current_message()`: drop the quoted thread
//! 3. `evaluator::evaluate()`: first-match rules, once for labels, once for clients
//! 4. `ClassificationSession::classify()`: apply label ⇒ client ⇒ forward ⇒ close
//!
//! **Nothing downstream of a failed gate runs.** Failures become report rows.

pub mod cursor;
pub mod evaluator;
pub mod rules;
pub mod segmenter;
pub mod session;
pub mod triage;
pub mod types;
