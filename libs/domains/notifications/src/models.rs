//! Data models for the notifications domain.
//!
//! Jobs arrive on the stream as flat JSON objects discriminated by an
//! `emailType` field. `EmailJob` captures the raw envelope so the payload
//! round-trips unchanged; `NotificationPayload` is the closed, typed view
//! the router matches on.

use crate::error::{NotificationError, NotificationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stream_worker::StreamJob;

/// Discriminant value for license purchase notifications.
pub const LICENSE_PURCHASE: &str = "license_purchase";

/// Discriminant value for credit purchase notifications.
pub const CREDIT_PURCHASE: &str = "credit_purchase";

/// Fields carried by a license purchase job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicensePurchaseData {
    pub user_id: i64,
    pub license_id: i64,
    pub license_key: String,
    pub customer_email: String,
    pub customer_name: String,
    pub license_type_name: String,
    pub license_type_description: String,
    pub license_type_max_domains: i64,
    pub stripe_license_record_id: i64,
}

/// Fields carried by a credit purchase job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPurchaseData {
    pub user_id: i64,
    pub license_id: i64,
    pub credit_amount: i64,
    pub transaction_id: i64,
    pub customer_email: String,
    pub purchase_type_name: String,
    pub purchase_type_description: String,
    pub stripe_credit_record_id: i64,
}

/// The closed set of notification payloads.
///
/// Adding a third email type means adding a variant here, and the compiler
/// flags every match that has to learn about it.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationPayload {
    LicensePurchase(LicensePurchaseData),
    CreditPurchase(CreditPurchaseData),
}

impl NotificationPayload {
    /// The wire discriminant for this payload.
    pub fn email_type(&self) -> &'static str {
        match self {
            NotificationPayload::LicensePurchase(_) => LICENSE_PURCHASE,
            NotificationPayload::CreditPurchase(_) => CREDIT_PURCHASE,
        }
    }

    pub fn user_id(&self) -> i64 {
        match self {
            NotificationPayload::LicensePurchase(data) => data.user_id,
            NotificationPayload::CreditPurchase(data) => data.user_id,
        }
    }

    pub fn customer_email(&self) -> &str {
        match self {
            NotificationPayload::LicensePurchase(data) => &data.customer_email,
            NotificationPayload::CreditPurchase(data) => &data.customer_email,
        }
    }

    /// The Stripe record id used for post-send traceability.
    pub fn stripe_record_id(&self) -> i64 {
        match self {
            NotificationPayload::LicensePurchase(data) => data.stripe_license_record_id,
            NotificationPayload::CreditPurchase(data) => data.stripe_credit_record_id,
        }
    }
}

/// A notification job as enqueued by the producer.
///
/// The envelope keeps every non-discriminant field raw so a job is never
/// mutated or reshaped between dequeue and dead-letter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailJob {
    #[serde(rename = "emailType")]
    pub email_type: String,

    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

impl EmailJob {
    /// Resolve the typed payload for this job.
    ///
    /// The discriminant is checked against the two known values; anything
    /// else is a validation failure carrying the literal value, and a known
    /// discriminant over malformed fields is an invalid-payload failure.
    pub fn payload(&self) -> NotificationResult<NotificationPayload> {
        let fields = Value::Object(self.fields.clone());

        match self.email_type.as_str() {
            LICENSE_PURCHASE => serde_json::from_value(fields)
                .map(NotificationPayload::LicensePurchase)
                .map_err(|e| NotificationError::InvalidPayload(e.to_string())),
            CREDIT_PURCHASE => serde_json::from_value(fields)
                .map(NotificationPayload::CreditPurchase)
                .map_err(|e| NotificationError::InvalidPayload(e.to_string())),
            other => Err(NotificationError::UnknownEmailType(other.to_string())),
        }
    }
}

impl StreamJob for EmailJob {
    fn job_id(&self) -> String {
        match self.fields.get("userId").and_then(Value::as_i64) {
            Some(user_id) => format!("{}:{}", self.email_type, user_id),
            None => self.email_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn license_job() -> EmailJob {
        serde_json::from_value(json!({
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
        .unwrap()
    }

    fn credit_job() -> EmailJob {
        serde_json::from_value(json!({
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
        .unwrap()
    }

    #[test]
    fn test_license_payload() {
        let payload = license_job().payload().unwrap();
        let NotificationPayload::LicensePurchase(data) = &payload else {
            panic!("expected license purchase payload");
        };
        assert_eq!(data.user_id, 1);
        assert_eq!(data.license_key, "ABC-123");
        assert_eq!(data.customer_email, "c@example.com");
        assert_eq!(data.license_type_max_domains, 5);
        assert_eq!(payload.email_type(), LICENSE_PURCHASE);
        assert_eq!(payload.stripe_record_id(), 200);
    }

    #[test]
    fn test_credit_payload() {
        let payload = credit_job().payload().unwrap();
        let NotificationPayload::CreditPurchase(data) = &payload else {
            panic!("expected credit purchase payload");
        };
        assert_eq!(data.credit_amount, 1000);
        assert_eq!(data.transaction_id, 300);
        assert_eq!(payload.customer_email(), "c2@example.com");
        assert_eq!(payload.stripe_record_id(), 400);
    }

    #[test]
    fn test_unknown_email_type() {
        let job: EmailJob = serde_json::from_value(json!({
            "emailType": "unknown_type",
            "userId": 1,
        }))
        .unwrap();

        let err = job.payload().unwrap_err();
        assert_eq!(err.to_string(), "Unknown email type: unknown_type");
    }

    #[test]
    fn test_known_type_with_missing_fields() {
        let job: EmailJob = serde_json::from_value(json!({
            "emailType": "license_purchase",
            "userId": 1,
        }))
        .unwrap();

        let err = job.payload().unwrap_err();
        assert!(matches!(err, NotificationError::InvalidPayload(_)));
    }

    #[test]
    fn test_job_round_trips_producer_json() {
        let raw = json!({
            "emailType": "license_purchase",
            "userId": 1,
            "licenseKey": "ABC-123",
        });
        let job: EmailJob = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&job).unwrap(), raw);
    }

    #[test]
    fn test_job_id() {
        assert_eq!(license_job().job_id(), "license_purchase:1");
        assert_eq!(credit_job().job_id(), "credit_purchase:2");

        let job: EmailJob =
            serde_json::from_value(json!({ "emailType": "license_purchase" })).unwrap();
        assert_eq!(job.job_id(), "license_purchase");
    }
}
