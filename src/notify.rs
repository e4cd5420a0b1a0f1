//! Operator notification on processing failures.
//!
//! Best effort: callers log a failed notification and carry on.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::config::NotifyConfig;
use crate::error::NotifyError;

/// Subject of every notification mail.
pub const NOTIFY_SUBJECT: &str = "[mail-triage] Couldn't process message";

/// Sends a failure message to an operator address.
pub trait Notifier: Send + Sync {
    fn notify(&self, address: &str, message: &str) -> Result<(), NotifyError>;
}

/// Notifier that only writes to the log. Used when SMTP is not configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, address: &str, message: &str) -> Result<(), NotifyError> {
        warn!(to = address, "{message}");
        Ok(())
    }
}

/// Plain-text notification mail over SMTP.
pub struct SmtpNotifier {
    config: NotifyConfig,
}

impl SmtpNotifier {
    pub fn new(config: NotifyConfig) -> Self {
        Self { config }
    }

    fn build(&self, address: &str, message: &str) -> Result<Message, NotifyError> {
        let from: Mailbox = self.config.from_address.parse().map_err(|e| NotifyError::Address {
            address: self.config.from_address.clone(),
            reason: format!("{e}"),
        })?;
        let to: Mailbox = address.parse().map_err(|e| NotifyError::Address {
            address: address.to_string(),
            reason: format!("{e}"),
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(NOTIFY_SUBJECT)
            .body(message.to_string())
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

impl Notifier for SmtpNotifier {
    fn notify(&self, address: &str, message: &str) -> Result<(), NotifyError> {
        let email = self.build(address, message)?;

        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.expose_secret().to_string(),
        );
        let transport = SmtpTransport::relay(&self.config.smtp_host)
            .map_err(|e| NotifyError::Relay(e.to_string()))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();

        transport
            .send(&email)
            .map_err(|e| NotifyError::Send(e.to_string()))?;

        info!(to = address, "Notification sent");
        Ok(())
    }
}

/// SMTP notifier when configured, log-only otherwise.
pub fn notifier_from_config(config: Option<NotifyConfig>) -> Box<dyn Notifier> {
    match config {
        Some(config) => Box::new(SmtpNotifier::new(config)),
        None => Box::new(LogNotifier),
    }
}
