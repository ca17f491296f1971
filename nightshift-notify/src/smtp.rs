use crate::{Delivery, Notification, Notifier};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use nightshift_common::{NightshiftError, Result};
use nightshift_config::NotifyConfig;
use std::path::Path;
use tracing::{info, warn};

/// Mail delivery through an authenticated SMTP relay.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    recipients: Vec<Mailbox>,
}

impl SmtpNotifier {
    /// `Ok(None)` when credentials or recipients were not supplied.
    pub fn from_config(cfg: &NotifyConfig) -> Result<Option<Self>> {
        let Some((from, password)) = cfg.mail_credentials() else {
            return Ok(None);
        };
        let recipients = cfg
            .recipients()
            .iter()
            .map(|addr| parse_mailbox(addr))
            .collect::<Result<Vec<_>>>()?;
        if recipients.is_empty() {
            return Ok(None);
        }

        let sender = Mailbox::new(Some(cfg.sender_name.clone()), parse_mailbox(&from)?.email);
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
            .map_err(|e| NightshiftError::Config(format!("smtp relay {}: {e}", cfg.smtp_host)))?
            .credentials(Credentials::new(from, password))
            .build();

        Ok(Some(Self {
            transport,
            sender,
            recipients,
        }))
    }

    async fn compose(&self, notification: &Notification) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(notification.subject.clone());
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        let mut parts =
            MultiPart::mixed().singlepart(SinglePart::plain(notification.body.clone()));
        if let Some(path) = notification.attachment.as_deref() {
            match tokio::fs::read(path).await {
                Ok(bytes) => {
                    let filename = path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "attachment".to_string());
                    parts = parts.singlepart(
                        Attachment::new(filename).body(bytes, attachment_content_type(path)?),
                    );
                }
                Err(err) => {
                    warn!(
                        target: "notify.smtp",
                        path = %path.display(),
                        error = %err,
                        "attachment unavailable, sending without it"
                    );
                }
            }
        }

        builder
            .multipart(parts)
            .map_err(|e| NightshiftError::NotificationDelivery(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, notification: &Notification) -> Result<Delivery> {
        let message = self.compose(notification).await?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NightshiftError::NotificationDelivery(e.to_string()))?;
        info!(
            target: "notify.smtp",
            subject = %notification.subject,
            recipients = self.recipients.len(),
            "email sent"
        );
        Ok(Delivery::Sent)
    }
}

fn parse_mailbox(raw: &str) -> Result<Mailbox> {
    raw.parse::<Mailbox>()
        .map_err(|e| NightshiftError::Config(format!("invalid mail address {raw:?}: {e}")))
}

fn attachment_content_type(path: &Path) -> Result<ContentType> {
    let mime = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        Some("csv") => "text/csv",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    };
    ContentType::parse(mime).map_err(|e| NightshiftError::NotificationDelivery(e.to_string()))
}
