//! Purchase notification mailer.
//!
//! Each notification fans out to two recipients: the configured admin
//! address gets the full business context, and the customer gets their own
//! variant with internal-only fields left out. The two sends are sequential
//! and fail-fast; a failure anywhere in the sequence surfaces as a single
//! wrapped send error.

use crate::error::{NotificationError, NotificationResult};
use crate::models::{CreditPurchaseData, LicensePurchaseData};
use crate::providers::{EmailSender, OutgoingEmail};
use crate::templates::TemplateCache;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

const ADMIN_LICENSE_TEMPLATE: &str = "admin-license-purchase-notification";
const CUSTOMER_LICENSE_TEMPLATE: &str = "customer-license-purchase-notification";
const ADMIN_CREDIT_TEMPLATE: &str = "admin-credit-purchase-notification";
const CUSTOMER_CREDIT_TEMPLATE: &str = "customer-credit-purchase-notification";

/// Renders and sends purchase notification emails.
pub struct Mailer<S: EmailSender> {
    sender: S,
    templates: Arc<TemplateCache>,
    admin_address: String,
}

impl<S: EmailSender> Mailer<S> {
    /// Create a new mailer.
    pub fn new(sender: S, templates: Arc<TemplateCache>, admin_address: impl Into<String>) -> Self {
        Self {
            sender,
            templates,
            admin_address: admin_address.into(),
        }
    }

    /// Send the admin and customer emails for a license purchase.
    pub async fn send_license_purchase_notification(
        &self,
        data: &LicensePurchaseData,
    ) -> NotificationResult<()> {
        self.dispatch_license_purchase(data)
            .await
            .map_err(NotificationError::into_send_failure)
    }

    /// Send the admin and customer emails for a credit purchase.
    pub async fn send_credit_purchase_notification(
        &self,
        data: &CreditPurchaseData,
    ) -> NotificationResult<()> {
        self.dispatch_credit_purchase(data)
            .await
            .map_err(NotificationError::into_send_failure)
    }

    async fn dispatch_license_purchase(
        &self,
        data: &LicensePurchaseData,
    ) -> NotificationResult<()> {
        let admin_context = json!({
            "userId": data.user_id,
            "licenseId": data.license_id,
            "licenseKey": data.license_key,
            "customerEmail": data.customer_email,
            "customerName": data.customer_name,
            "licenseTypeName": data.license_type_name,
            "licenseTypeDescription": data.license_type_description,
            "licenseTypeMaxDomains": data.license_type_max_domains,
            "stripeLicenseRecordId": data.stripe_license_record_id,
        });
        let html = self.templates.render(ADMIN_LICENSE_TEMPLATE, &admin_context).await?;
        self.deliver(OutgoingEmail {
            to: self.admin_address.clone(),
            subject: format!("New License Purchase: {}", data.license_type_name),
            html_body: html,
        })
        .await?;

        // The customer is the recipient; their own address stays out of the
        // body context.
        let customer_context = json!({
            "customerName": data.customer_name,
            "licenseKey": data.license_key,
            "licenseTypeName": data.license_type_name,
            "licenseTypeDescription": data.license_type_description,
            "licenseTypeMaxDomains": data.license_type_max_domains,
        });
        let html = self
            .templates
            .render(CUSTOMER_LICENSE_TEMPLATE, &customer_context)
            .await?;
        self.deliver(OutgoingEmail {
            to: data.customer_email.clone(),
            subject: format!("Your License is Ready: {}", data.license_type_name),
            html_body: html,
        })
        .await
    }

    async fn dispatch_credit_purchase(&self, data: &CreditPurchaseData) -> NotificationResult<()> {
        let admin_context = json!({
            "userId": data.user_id,
            "licenseId": data.license_id,
            "creditAmount": data.credit_amount,
            "transactionId": data.transaction_id,
            "customerEmail": data.customer_email,
            "purchaseTypeName": data.purchase_type_name,
            "purchaseTypeDescription": data.purchase_type_description,
            "stripeCreditRecordId": data.stripe_credit_record_id,
        });
        let html = self.templates.render(ADMIN_CREDIT_TEMPLATE, &admin_context).await?;
        self.deliver(OutgoingEmail {
            to: self.admin_address.clone(),
            subject: format!("New Credit Purchase: {}", data.purchase_type_name),
            html_body: html,
        })
        .await?;

        let customer_context = json!({
            "creditAmount": data.credit_amount,
            "purchaseTypeName": data.purchase_type_name,
            "purchaseTypeDescription": data.purchase_type_description,
        });
        let html = self
            .templates
            .render(CUSTOMER_CREDIT_TEMPLATE, &customer_context)
            .await?;
        self.deliver(OutgoingEmail {
            to: data.customer_email.clone(),
            subject: format!("Thank You for Your Credit Purchase: {}", data.purchase_type_name),
            html_body: html,
        })
        .await
    }

    async fn deliver(&self, email: OutgoingEmail) -> NotificationResult<()> {
        debug!(
            to = %email.to,
            subject = %email.subject,
            sender = self.sender.name(),
            "Dispatching notification email"
        );

        self.sender
            .send(email)
            .await
            .map_err(|e| NotificationError::Email(e.to_string()))
    }
}
