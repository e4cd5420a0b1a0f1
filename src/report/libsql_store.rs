//! libSQL report store. Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ReportError;
use crate::pipeline::cursor::ResumeMarker;
use crate::pipeline::types::ReportRow;
use crate::report::migrations;
use crate::report::{ReportStore, StatusCount};

/// Report store on a single reused libSQL connection.
pub struct LibSqlReportStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlReportStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, ReportError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ReportError::Open(format!("Failed to create report directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ReportError::Open(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Report store opened");
        Ok(store)
    }

    /// In-memory store (for tests and dry runs).
    pub async fn new_memory() -> Result<Self, ReportError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| ReportError::Open(format!("Failed to create in-memory database: {e}")))?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, ReportError> {
        let conn = db
            .connect()
            .map_err(|e| ReportError::Open(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

#[async_trait]
impl ReportStore for LibSqlReportStore {
    async fn append_rows(&self, run_id: Uuid, rows: &[ReportRow]) -> Result<usize, ReportError> {
        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;

        for row in rows {
            let changed = self
                .conn
                .execute(
                    "INSERT OR IGNORE INTO report_rows (id, run_id, subject, sender, date, label,
                        status, email_body, label_check, url, client, client_check, forward,
                        email_closed, recorded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                    params![
                        Uuid::new_v4().to_string(),
                        run_id.to_string(),
                        row.subject.clone(),
                        row.sender.clone(),
                        row.date.clone(),
                        row.label.clone(),
                        row.status.clone(),
                        row.email_body.clone(),
                        row.check.clone(),
                        row.url.clone(),
                        row.client.clone(),
                        row.clients_check_text.clone(),
                        row.forward.clone(),
                        row.email_closed.clone(),
                        now.clone(),
                    ],
                )
                .await
                .map_err(|e| ReportError::Query(format!("append_rows: {e}")))?;
            inserted += changed as usize;
        }

        debug!(run_id = %run_id, offered = rows.len(), inserted, "Report rows appended");
        Ok(inserted)
    }

    async fn last_marker(&self) -> Result<ResumeMarker, ReportError> {
        let mut rows = self
            .conn
            .query(
                "SELECT subject, date FROM report_rows ORDER BY date DESC, recorded_at DESC LIMIT 1",
                (),
            )
            .await
            .map_err(|e| ReportError::Query(format!("last_marker: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let subject: String = row
                    .get(0)
                    .map_err(|e| ReportError::Query(format!("row parse: {e}")))?;
                let date: String = row
                    .get(1)
                    .map_err(|e| ReportError::Query(format!("row parse: {e}")))?;
                Ok(ResumeMarker::new(subject, date))
            }
            Ok(None) => Ok(ResumeMarker::empty()),
            Err(e) => Err(ReportError::Query(format!("last_marker: {e}"))),
        }
    }

    async fn status_counts(&self) -> Result<Vec<StatusCount>, ReportError> {
        let mut rows = self
            .conn
            .query(
                "SELECT status, COUNT(*) AS n FROM report_rows
                 GROUP BY status ORDER BY n DESC, status ASC",
                (),
            )
            .await
            .map_err(|e| ReportError::Query(format!("status_counts: {e}")))?;

        let mut counts = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ReportError::Query(format!("status_counts: {e}")))?
        {
            let status: String = row
                .get(0)
                .map_err(|e| ReportError::Query(format!("row parse: {e}")))?;
            let count: i64 = row
                .get(1)
                .map_err(|e| ReportError::Query(format!("row parse: {e}")))?;
            counts.push(StatusCount {
                status,
                count: count as u64,
            });
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(subject: &str, date: &str, status: &str) -> ReportRow {
        ReportRow {
            subject: subject.into(),
            sender: "Bob".into(),
            date: date.into(),
            status: status.into(),
            forward: "Not forwarded".into(),
            email_closed: "No".into(),
            ..ReportRow::default()
        }
    }

    #[tokio::test]
    async fn empty_store_has_empty_marker() {
        let store = LibSqlReportStore::new_memory().await.unwrap();
        let marker = store.last_marker().await.unwrap();
        assert!(marker.is_empty());
        assert!(store.status_counts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn marker_is_newest_date() {
        let store = LibSqlReportStore::new_memory().await.unwrap();
        let rows = vec![
            row("middle", "2024-05-10 10:00", "Label was added"),
            row("newest", "2024-05-11 08:00", "Couldn't set the label"),
            row("oldest", "2024-05-09 17:45", "Label was added"),
        ];
        store.append_rows(Uuid::new_v4(), &rows).await.unwrap();

        let marker = store.last_marker().await.unwrap();
        assert_eq!(marker.last_subject.as_deref(), Some("newest"));
        assert_eq!(marker.last_date.as_deref(), Some("2024-05-11 08:00"));
    }

    #[tokio::test]
    async fn duplicate_rows_are_skipped() {
        let store = LibSqlReportStore::new_memory().await.unwrap();
        let rows = vec![row("a", "2024-05-10", "Label was added")];

        assert_eq!(store.append_rows(Uuid::new_v4(), &rows).await.unwrap(), 1);
        assert_eq!(store.append_rows(Uuid::new_v4(), &rows).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn distinct_messages_in_same_minute_are_kept() {
        let store = LibSqlReportStore::new_memory().await.unwrap();
        let mut first = row("Re: invoice", "2024-05-10 10:00", "Label was added");
        first.url = "https://mail.example.com/messages/show?msg=1".into();
        first.email_body = "Invoice 1 attached".into();
        let mut second = first.clone();
        second.url = "https://mail.example.com/messages/show?msg=2".into();

        let inserted = store
            .append_rows(Uuid::new_v4(), &[first, second])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
    }

    #[tokio::test]
    async fn counts_statuses() {
        let store = LibSqlReportStore::new_memory().await.unwrap();
        let rows = vec![
            row("a", "2024-05-10", "Label was added"),
            row("b", "2024-05-10", "Label was added"),
            row("c", "2024-05-10", "Labels were set before"),
        ];
        store.append_rows(Uuid::new_v4(), &rows).await.unwrap();

        let counts = store.status_counts().await.unwrap();
        assert_eq!(
            counts,
            vec![
                StatusCount {
                    status: "Label was added".into(),
                    count: 2
                },
                StatusCount {
                    status: "Labels were set before".into(),
                    count: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn local_file_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("triage.db");

        {
            let store = LibSqlReportStore::new_local(&path).await.unwrap();
            store
                .append_rows(Uuid::new_v4(), &[row("kept", "2024-05-12", "Label was added")])
                .await
                .unwrap();
        }

        let reopened = LibSqlReportStore::new_local(&path).await.unwrap();
        let marker = reopened.last_marker().await.unwrap();
        assert_eq!(marker.last_subject.as_deref(), Some("kept"));
    }
}
