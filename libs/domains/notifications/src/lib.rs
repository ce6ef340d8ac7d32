//! Notifications Domain
//!
//! Email notification dispatch for purchase events.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │    Producer     │  ← Queues purchase notification jobs
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │   Redis Stream  │  ← email_notifications queue
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │  Email Worker   │  ← Consumes and routes jobs
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │     Mailer      │  ← Renders admin + customer emails, sends via SMTP
//! └─────────────────┘
//! ```
//!
//! Each job carries an `emailType` discriminant (`license_purchase` or
//! `credit_purchase`). The processor parses it into a closed payload enum,
//! and the mailer sends two emails per job: one to the configured admin
//! address and one to the customer.

pub mod error;
pub mod mailer;
pub mod models;
pub mod processor;
pub mod providers;
pub mod streams;
pub mod templates;

// Re-export commonly used types
pub use error::{NotificationError, NotificationResult};
pub use mailer::Mailer;
pub use models::{CreditPurchaseData, EmailJob, LicensePurchaseData, NotificationPayload};
pub use processor::NotificationProcessor;
pub use providers::{EmailSender, OutgoingEmail, SendError, SmtpSender};
pub use streams::EmailNotificationStream;
pub use templates::TemplateCache;
