//! Error types for the notifications domain.

use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur in the notifications domain.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Job carried a discriminant outside the known set.
    #[error("Unknown email type: {0}")]
    UnknownEmailType(String),

    /// Job fields did not match the shape its discriminant requires.
    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),

    /// Template file missing/unreadable, or compile/render failure.
    #[error("template '{name}': {reason}")]
    Template { name: String, reason: String },

    /// Any failure during the send sequence, wrapped for the caller.
    #[error("Failed to send email: {0}")]
    Email(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotificationError {
    /// Collapse any failure from the send pipeline into the single wrapped
    /// form callers see. Already-wrapped errors pass through untouched.
    pub(crate) fn into_send_failure(self) -> Self {
        match self {
            wrapped @ NotificationError::Email(_) => wrapped,
            other => NotificationError::Email(other.to_string()),
        }
    }
}

impl From<core_config::ConfigError> for NotificationError {
    fn from(err: core_config::ConfigError) -> Self {
        NotificationError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_email_type_message() {
        let err = NotificationError::UnknownEmailType("unknown_type".to_string());
        assert_eq!(err.to_string(), "Unknown email type: unknown_type");
    }

    #[test]
    fn test_send_failure_wrapping() {
        let err = NotificationError::Template {
            name: "admin-license-purchase-notification".to_string(),
            reason: "file not found".to_string(),
        };
        let wrapped = err.into_send_failure();
        assert_eq!(
            wrapped.to_string(),
            "Failed to send email: template 'admin-license-purchase-notification': file not found"
        );
    }

    #[test]
    fn test_send_failure_wrapping_is_idempotent() {
        let err = NotificationError::Email("SMTP connection failed".to_string());
        let wrapped = err.into_send_failure();
        assert_eq!(wrapped.to_string(), "Failed to send email: SMTP connection failed");
    }
}
