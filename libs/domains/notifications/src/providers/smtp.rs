//! SMTP email sender implementation using lettre.

use super::{EmailSender, OutgoingEmail, SendError};
use async_trait::async_trait;
use core_config::smtp::SmtpSettings;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// SMTP sender with a lazily-created, process-lifetime transport.
///
/// The transport is built on the first send and reused afterwards; lettre
/// manages the underlying connections. Safe for concurrent sends.
pub struct SmtpSender {
    settings: SmtpSettings,
    transport: OnceCell<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpSender {
    /// Create a new SMTP sender. No connection is made until the first send.
    pub fn new(settings: SmtpSettings) -> Self {
        Self {
            settings,
            transport: OnceCell::new(),
        }
    }

    /// The shared transport, built on first use.
    async fn transport(&self) -> Result<&AsyncSmtpTransport<Tokio1Executor>, SendError> {
        self.transport
            .get_or_try_init(|| async { Self::build_transport(&self.settings) })
            .await
    }

    /// Build the SMTP transport from settings.
    ///
    /// `secure` selects implicit TLS; otherwise the connection is upgraded
    /// via STARTTLS. The timeout bounds connection establishment and socket
    /// reads so a dead server cannot hang a send forever.
    fn build_transport(
        settings: &SmtpSettings,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, SendError> {
        let builder = if settings.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        }
        .map_err(|e| SendError(e.to_string()))?;

        Ok(builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(settings.timeout_secs)))
            .build())
    }

    /// Build a lettre Message from an outgoing email.
    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, SendError> {
        let from: Mailbox = self
            .settings
            .from_address
            .parse()
            .map_err(|e| SendError(format!("invalid from address: {e}")))?;

        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| SendError(format!("invalid recipient address '{}': {e}", email.to)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.html_body.clone())
            .map_err(|e| SendError(e.to_string()))
    }
}

#[async_trait]
impl EmailSender for SmtpSender {
    async fn send(&self, email: OutgoingEmail) -> Result<(), SendError> {
        debug!(
            to = %email.to,
            subject = %email.subject,
            host = %self.settings.host,
            port = %self.settings.port,
            "Sending email via SMTP"
        );

        let message = self.build_message(&email)?;
        let transport = self.transport().await?;

        transport
            .send(message)
            .await
            .map_err(|e| SendError(e.to_string()))?;

        info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
