//! Operator notifications.
//!
//! The pipeline hands a [`Notification`] to whatever [`Notifier`] the binary
//! selected. Delivery problems are reported back as errors for the caller to
//! log; they never decide the outcome of a run.
pub mod smtp;

use async_trait::async_trait;
use nightshift_common::Result;
use nightshift_config::NotifyConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub use smtp::SmtpNotifier;

/// One outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    /// File attached when it still exists at send time.
    pub attachment: Option<PathBuf>,
}

impl Notification {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachment = Some(path.into());
        self
    }
}

/// What happened to a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Dispatch is not configured; nothing left the process.
    Skipped,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<Delivery>;
}

/// Stand-in used when mail credentials were not supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, notification: &Notification) -> Result<Delivery> {
        info!(
            target: "notify.smtp",
            subject = %notification.subject,
            "skipping email: no credentials provided"
        );
        Ok(Delivery::Skipped)
    }
}

/// Pick the SMTP notifier when sender credentials and recipients exist,
/// otherwise the disabled one.
pub fn build_notifier(cfg: &NotifyConfig) -> Arc<dyn Notifier> {
    match SmtpNotifier::from_config(cfg) {
        Ok(Some(notifier)) => Arc::new(notifier),
        Ok(None) => Arc::new(DisabledNotifier),
        Err(err) => {
            warn!(target: "notify.smtp", error = %err, "email dispatch disabled");
            Arc::new(DisabledNotifier)
        }
    }
}
