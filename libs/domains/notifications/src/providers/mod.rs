//! Email sender implementations.
//!
//! This module contains the `EmailSender` trait and the SMTP implementation
//! used in production. The trait is the seam tests mock to observe dispatch
//! behavior without a mail server.

mod smtp;

pub use smtp::SmtpSender;

use async_trait::async_trait;
use thiserror::Error;

/// A single outbound email, rendered and addressed.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Rendered HTML body.
    pub html_body: String,
}

/// Transport-level send failure.
///
/// Displays as the bare cause message so callers can wrap it without
/// stacking prefixes.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SendError(pub String);

/// Trait for email sending transports.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send one email.
    async fn send(&self, email: OutgoingEmail) -> Result<(), SendError>;

    /// Get the sender name for logging.
    fn name(&self) -> &'static str;
}
