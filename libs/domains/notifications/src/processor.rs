//! Notification processor for the stream worker.
//!
//! Routes each dequeued job to the matching mailer operation. The processor
//! never retries: failures are logged with their attempt count and re-raised
//! so the queue layer applies its retry policy.

use crate::error::NotificationError;
use crate::mailer::Mailer;
use crate::models::{EmailJob, NotificationPayload};
use crate::providers::EmailSender;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use stream_worker::{StreamError, StreamEvent, StreamProcessor};
use tracing::{error, info};

/// Routes notification jobs to the mailer.
pub struct NotificationProcessor<S: EmailSender> {
    mailer: Mailer<S>,
}

impl<S: EmailSender> NotificationProcessor<S> {
    /// Create a new notification processor.
    pub fn new(mailer: Mailer<S>) -> Self {
        Self { mailer }
    }

    /// Dispatch a payload to the matching notification routine.
    pub async fn route(&self, payload: &NotificationPayload) -> Result<(), NotificationError> {
        match payload {
            NotificationPayload::LicensePurchase(data) => {
                self.mailer.send_license_purchase_notification(data).await
            }
            NotificationPayload::CreditPurchase(data) => {
                self.mailer.send_credit_purchase_notification(data).await
            }
        }
    }

    fn log_started(&self, event: &StreamEvent<EmailJob>, payload: &NotificationPayload) {
        match payload {
            NotificationPayload::LicensePurchase(data) => info!(
                stream_id = %event.stream_id,
                email_type = %payload.email_type(),
                user_id = data.user_id,
                license_id = data.license_id,
                license_key = %data.license_key,
                customer_email = %data.customer_email,
                customer_name = %data.customer_name,
                license_type_name = %data.license_type_name,
                license_type_max_domains = data.license_type_max_domains,
                stripe_license_record_id = data.stripe_license_record_id,
                "Processing license purchase notification"
            ),
            NotificationPayload::CreditPurchase(data) => info!(
                stream_id = %event.stream_id,
                email_type = %payload.email_type(),
                user_id = data.user_id,
                license_id = data.license_id,
                credit_amount = data.credit_amount,
                transaction_id = data.transaction_id,
                customer_email = %data.customer_email,
                purchase_type_name = %data.purchase_type_name,
                stripe_credit_record_id = data.stripe_credit_record_id,
                "Processing credit purchase notification"
            ),
        }
    }
}

#[async_trait]
impl<S: EmailSender + 'static> StreamProcessor<EmailJob> for NotificationProcessor<S> {
    async fn process(&self, event: &StreamEvent<EmailJob>) -> Result<(), StreamError> {
        let payload = event.job.payload()?;
        self.log_started(event, &payload);

        if let Err(e) = self.route(&payload).await {
            error!(
                stream_id = %event.stream_id,
                email_type = %payload.email_type(),
                user_id = payload.user_id(),
                to = %payload.customer_email(),
                attempt = %event.delivery_count,
                error = %e,
                "Failed to send notification emails"
            );
            return Err(e.into());
        }

        info!(
            stream_id = %event.stream_id,
            email_type = %payload.email_type(),
            user_id = payload.user_id(),
            to = %payload.customer_email(),
            stripe_record_id = payload.stripe_record_id(),
            completed_at = %Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "Notification emails sent successfully"
        );

        Ok(())
    }

    fn name(&self) -> &'static str {
        "NotificationProcessor"
    }
}

impl From<NotificationError> for StreamError {
    fn from(e: NotificationError) -> Self {
        StreamError::Processing(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockEmailSender;
    use crate::templates::TemplateCache;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn template_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let templates = [
            "admin-license-purchase-notification",
            "customer-license-purchase-notification",
            "admin-credit-purchase-notification",
            "customer-credit-purchase-notification",
        ];
        for name in templates {
            std::fs::write(
                dir.path().join(format!("{name}.html")),
                "<p>{{timestamp}}</p>",
            )
            .unwrap();
        }
        dir
    }

    fn processor(sender: MockEmailSender, dir: &TempDir) -> NotificationProcessor<MockEmailSender> {
        let mailer = Mailer::new(
            sender,
            Arc::new(TemplateCache::new(dir.path())),
            "admin@example.com",
        );
        NotificationProcessor::new(mailer)
    }

    fn license_event() -> StreamEvent<EmailJob> {
        let job: EmailJob = serde_json::from_value(json!({
            "emailType": "license_purchase",
            "userId": 1,
            "licenseId": 100,
            "licenseKey": "ABC-123",
            "customerEmail": "c@example.com",
            "customerName": "John Doe",
            "licenseTypeName": "Professional",
            "licenseTypeDescription": "Professional License",
            "licenseTypeMaxDomains": 5,
            "stripeLicenseRecordId": 200,
        }))
        .unwrap();
        StreamEvent::new("1-0".to_string(), job)
    }

    #[tokio::test]
    async fn test_license_job_routes_to_both_sends() {
        let dir = template_dir();
        let mut sender = MockEmailSender::new();
        sender.expect_name().return_const("mock");
        sender
            .expect_send()
            .withf(|email| email.to == "admin@example.com")
            .times(1)
            .returning(|_| Ok(()));
        sender
            .expect_send()
            .withf(|email| email.to == "c@example.com")
            .times(1)
            .returning(|_| Ok(()));

        processor(sender, &dir)
            .process(&license_event())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_credit_job_routes_to_credit_dispatch() {
        let dir = template_dir();
        let mut sender = MockEmailSender::new();
        sender.expect_name().return_const("mock");
        sender
            .expect_send()
            .withf(|email| email.subject == "New Credit Purchase: Standard Package")
            .times(1)
            .returning(|_| Ok(()));
        sender
            .expect_send()
            .withf(|email| {
                email.to == "c2@example.com"
                    && email.subject == "Thank You for Your Credit Purchase: Standard Package"
            })
            .times(1)
            .returning(|_| Ok(()));

        let job: EmailJob = serde_json::from_value(json!({
            "emailType": "credit_purchase",
            "userId": 2,
            "licenseId": 200,
            "creditAmount": 1000,
            "transactionId": 300,
            "customerEmail": "c2@example.com",
            "purchaseTypeName": "Standard Package",
            "purchaseTypeDescription": "Standard Credit Package",
            "stripeCreditRecordId": 400,
        }))
        .unwrap();

        processor(sender, &dir)
            .process(&StreamEvent::new("2-0".to_string(), job))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_email_type_fails_without_sending() {
        let dir = template_dir();
        // No expectations: any send call fails the test
        let sender = MockEmailSender::new();

        let job: EmailJob = serde_json::from_value(json!({
            "emailType": "unknown_type",
            "userId": 1,
        }))
        .unwrap();

        let err = processor(sender, &dir)
            .process(&StreamEvent::new("3-0".to_string(), job))
            .await
            .unwrap_err();

        assert!(matches!(err, StreamError::Processing(_)));
        assert!(err.to_string().contains("Unknown email type: unknown_type"));
    }

    #[tokio::test]
    async fn test_send_failure_is_reraised() {
        let dir = template_dir();
        let mut sender = MockEmailSender::new();
        sender.expect_name().return_const("mock");
        sender
            .expect_send()
            .times(1)
            .returning(|_| Err(crate::providers::SendError("SMTP connection failed".to_string())));

        let err = processor(sender, &dir)
            .process(&license_event())
            .await
            .unwrap_err();

        assert!(err
            .to_string()
            .contains("Failed to send email: SMTP connection failed"));
    }
}
