use crate::{env_flag, env_parsed_or, env_required, ConfigError, FromEnv};

/// SMTP transport and addressing settings.
///
/// `secure = true` means implicit TLS on connect; `false` means STARTTLS
/// after the greeting. The timeout bounds connection establishment and
/// socket reads so an unresponsive server cannot hang a job indefinitely.
#[derive(Clone, Debug)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub username: String,
    pub password: String,
    /// Sender address for all outgoing mail.
    pub from_address: String,
    /// Recipient of admin notification copies.
    pub admin_address: String,
    pub timeout_secs: u64,
}

impl FromEnv for SmtpSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_required("SMTP_HOST")?,
            port: env_parsed_or("SMTP_PORT", 587)?,
            secure: env_flag("SMTP_SECURE", false),
            username: env_required("SMTP_USERNAME")?,
            password: env_required("SMTP_PASSWORD")?,
            from_address: env_required("SMTP_FROM_ADDRESS")?,
            admin_address: env_required("ADMIN_EMAIL")?,
            timeout_secs: env_parsed_or("SMTP_TIMEOUT_SECS", 30)?,
        })
    }
}
