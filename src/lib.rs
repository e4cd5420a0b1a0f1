//! Mail triage: rule-based labelling, client tagging, forwarding and
//! closing of support mail.

pub mod config;
pub mod eml;
pub mod error;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod ui;
