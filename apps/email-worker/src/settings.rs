//! Aggregated configuration for the email worker process.

use core_config::redis::RedisSettings;
use core_config::smtp::SmtpSettings;
use core_config::{env_or_default, env_parsed_or, ConfigError, FromEnv};
use std::path::PathBuf;

/// Everything the worker needs, validated up front.
#[derive(Clone, Debug)]
pub struct Settings {
    pub redis: RedisSettings,
    pub smtp: SmtpSettings,
    /// Directory holding the notification HTML templates.
    pub template_dir: PathBuf,
    /// Maximum number of jobs processed concurrently.
    pub concurrency: usize,
}

impl FromEnv for Settings {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            redis: RedisSettings::from_env()?,
            smtp: SmtpSettings::from_env()?,
            template_dir: PathBuf::from(env_or_default("EMAIL_TEMPLATE_DIR", "templates")),
            concurrency: env_parsed_or("WORKER_CONCURRENCY", 5)?,
        })
    }
}
