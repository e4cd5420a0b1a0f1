//! Version-tracked schema migrations for the report database.
//!
//! Each migration has a version number and SQL. `run_migrations()` reads
//! the current version and applies only newer ones, in order.

use libsql::Connection;
use tracing::info;

use crate::error::ReportError;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "report_rows",
        sql: r#"
            CREATE TABLE IF NOT EXISTS report_rows (
                id TEXT PRIMARY KEY,
                run_id TEXT NOT NULL,
                subject TEXT NOT NULL,
                sender TEXT NOT NULL,
                date TEXT NOT NULL,
                label TEXT NOT NULL,
                status TEXT NOT NULL,
                email_body TEXT NOT NULL,
                label_check TEXT NOT NULL,
                url TEXT NOT NULL,
                client TEXT NOT NULL,
                client_check TEXT NOT NULL,
                forward TEXT NOT NULL,
                email_closed TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                UNIQUE (subject, sender, date, url, email_body, label, status)
            );
            CREATE INDEX IF NOT EXISTS idx_report_rows_date ON report_rows(date);
            CREATE INDEX IF NOT EXISTS idx_report_rows_status ON report_rows(status);
        "#,
    },
];

/// Apply all pending migrations.
pub async fn run_migrations(conn: &Connection) -> Result<(), ReportError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| ReportError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let current_version = current_version(conn).await?;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            conn.execute_batch(migration.sql).await.map_err(|e| {
                ReportError::Migration(format!(
                    "Migration V{} ({}) failed: {e}",
                    migration.version, migration.name
                ))
            })?;
            record_version(conn, migration.version, migration.name).await?;
        }
    }

    Ok(())
}

/// Highest applied migration version, or 0 if none.
pub async fn current_version(conn: &Connection) -> Result<i64, ReportError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| ReportError::Migration(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| ReportError::Migration(format!("Failed to read migration version: {e}")))?;

    match row {
        Some(row) => row.get::<i64>(0).map_err(|e| {
            ReportError::Migration(format!("Failed to parse migration version: {e}"))
        }),
        None => Ok(0),
    }
}

async fn record_version(conn: &Connection, version: i64, name: &str) -> Result<(), ReportError> {
    conn.execute(
        "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
        libsql::params![version, name],
    )
    .await
    .map_err(|e| ReportError::Migration(format!("Failed to record migration V{version}: {e}")))?;
    Ok(())
}
