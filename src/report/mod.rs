//! Report persistence, one row per processed message.
//!
//! The report is append-only and doubles as the resume state: the newest
//! recorded date is where the next run stops.

pub mod libsql_store;
pub mod migrations;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ReportError;
use crate::pipeline::cursor::ResumeMarker;
use crate::pipeline::types::ReportRow;

pub use libsql_store::LibSqlReportStore;

/// Count of report rows per status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

/// Backend-agnostic report store.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Append rows for one run. Rows identical to a recorded one are skipped.
    /// Returns the number of rows inserted.
    async fn append_rows(&self, run_id: Uuid, rows: &[ReportRow]) -> Result<usize, ReportError>;

    /// Subject and date of the newest recorded message; empty when none.
    async fn last_marker(&self) -> Result<ResumeMarker, ReportError>;

    /// Rows per status, most frequent first.
    async fn status_counts(&self) -> Result<Vec<StatusCount>, ReportError>;
}
