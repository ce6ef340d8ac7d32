use crate::{env_parsed_or, env_required, ConfigError, FromEnv};

/// Redis connection settings for the queue backing store.
#[derive(Clone, Debug)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    /// Logical database index.
    pub db: u8,
}

impl RedisSettings {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            password: None,
            db: 0,
        }
    }

    /// Render the settings as a `redis://` connection URL.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }
}

impl FromEnv for RedisSettings {
    /// Requires REDIS_HOST to be set (no default)
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_required("REDIS_HOST")?,
            port: env_parsed_or("REDIS_PORT", 6379)?,
            password: std::env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty()),
            db: env_parsed_or("REDIS_DB", 0)?,
        })
    }
}
