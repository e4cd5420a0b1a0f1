use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mail_triage::config::{LabelPick, TriageConfig};
use mail_triage::eml;
use mail_triage::logging::LogContext;
use mail_triage::notify::notifier_from_config;
use mail_triage::pipeline::rules::RuleTable;
use mail_triage::pipeline::session::ClassificationSession;
use mail_triage::pipeline::triage::TriageRun;
use mail_triage::report::{LibSqlReportStore, ReportStore};
use mail_triage::ui::{MailboxUi, PreviewUi, read_mailbox};

#[derive(Parser, Debug)]
#[command(name = "mail-triage", version, about = "Rule-based email triage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify one message file and print the decision as JSON.
    Classify {
        message: PathBuf,
        #[arg(long, help = "Label rule table (defaults to TRIAGE_LABEL_RULES)")]
        labels: Option<PathBuf>,
        #[arg(long, help = "Client rule table (defaults to TRIAGE_CLIENT_RULES)")]
        clients: Option<PathBuf>,
        #[arg(long, value_enum)]
        pick: Option<LabelPick>,
    },
    /// Triage a directory of message files and append the results to the report.
    Triage {
        #[arg(long)]
        inbox: PathBuf,
        #[arg(long)]
        labels: Option<PathBuf>,
        #[arg(long)]
        clients: Option<PathBuf>,
        #[arg(long, help = "Report database (defaults to TRIAGE_REPORT_DB)")]
        db: Option<PathBuf>,
        #[arg(long, value_enum)]
        pick: Option<LabelPick>,
    },
    /// Load a rule table and list its dropped rows.
    Rules { path: PathBuf },
    /// Print where the next run stops.
    Marker {
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Print report rows per status.
    Summary {
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let cli = Cli::parse();
    let config = TriageConfig::from_env()?;
    let _log = LogContext::init(&config.log_dir)?;

    match cli.command {
        Commands::Classify {
            message,
            labels,
            clients,
            pick,
        } => {
            let session = load_session(&config, labels, clients, pick)?;
            let segmenter = config.segmenter.segmenter();

            let raw = std::fs::read(&message)
                .with_context(|| format!("Failed to read {}", message.display()))?;
            let fields = eml::parse_message(&raw)?;
            let current = fields.with_body(segmenter.extract(&fields.body));

            let mut ui = PreviewUi::new(current.clone());
            let decision = session.classify(&current, &mut ui);
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        Commands::Triage {
            inbox,
            labels,
            clients,
            db,
            pick,
        } => {
            let session = load_session(&config, labels, clients, pick)?;
            let segmenter = config.segmenter.segmenter();
            let store = open_store(&config, db.as_deref()).await?;
            let marker = store.last_marker().await?;
            let entries = read_mailbox(&inbox)?;

            let notifier = notifier_from_config(config.notify.clone());
            let mut run = TriageRun::new(&session, &segmenter, notifier.as_ref());
            if let Some(operator) = &config.operator_address {
                run = run.with_operator(operator.clone());
            }

            // SMTP notifications block; keep them off the async workers.
            let mut ui = MailboxUi::new();
            let report = tokio::task::block_in_place(|| run.process(&entries, &marker, &mut ui));

            let inserted = store.append_rows(report.run_id, &report.rows).await?;
            println!(
                "Run {}: {} messages listed, {} processed, {} new report rows{}",
                report.run_id,
                entries.len(),
                report.rows.len(),
                inserted,
                if report.stopped {
                    " (stopped at last processed date)"
                } else {
                    ""
                }
            );
        }
        Commands::Rules { path } => {
            let table = RuleTable::load(&path)?;
            println!("{}: {} rules", table.name(), table.len());
            for row in table.dropped() {
                println!("  dropped row {}: {}", row.index, row.reason);
            }
        }
        Commands::Marker { db } => {
            let store = open_store(&config, db.as_deref()).await?;
            let marker = store.last_marker().await?;
            if marker.is_empty() {
                println!("No messages recorded yet");
            } else {
                println!(
                    "{}\t{}",
                    marker.last_date.as_deref().unwrap_or(""),
                    marker.last_subject.as_deref().unwrap_or("")
                );
            }
        }
        Commands::Summary { db } => {
            let store = open_store(&config, db.as_deref()).await?;
            for count in store.status_counts().await? {
                println!("{:>6}  {}", count.count, count.status);
            }
        }
    }

    Ok(())
}

/// Build the session from CLI overrides, falling back to the environment.
fn load_session(
    config: &TriageConfig,
    labels: Option<PathBuf>,
    clients: Option<PathBuf>,
    pick: Option<LabelPick>,
) -> Result<ClassificationSession> {
    let label_path = labels
        .or_else(|| config.label_rules.clone())
        .context("No label rule table: pass --labels or set TRIAGE_LABEL_RULES")?;
    let label_table = RuleTable::load(&label_path)?;

    let client_table = match clients.or_else(|| config.client_rules.clone()) {
        Some(path) => RuleTable::load(&path)?,
        None => RuleTable::empty("clients"),
    };

    let picker = pick.unwrap_or(config.label_pick).picker();
    Ok(ClassificationSession::with_picker(
        label_table,
        client_table,
        picker,
    ))
}

async fn open_store(config: &TriageConfig, db: Option<&Path>) -> Result<LibSqlReportStore> {
    let path = db.unwrap_or(config.report_db.as_path());
    LibSqlReportStore::new_local(path)
        .await
        .with_context(|| format!("Failed to open report database at {}", path.display()))
}
