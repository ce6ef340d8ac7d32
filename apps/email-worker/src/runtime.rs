//! Worker runtime lifecycle.
//!
//! Owns the queue connection and the consumption loop. Lifecycle is
//! `Stopped -> Running -> Stopped`; `start` must not be called again without
//! an intervening `shutdown`. Shutdown is idempotent, never masks errors,
//! and never exits the process - that decision belongs to the entrypoint.

use crate::settings::Settings;
use domain_notifications::{
    EmailJob, EmailNotificationStream, Mailer, NotificationProcessor, SmtpSender, TemplateCache,
};
use eyre::WrapErr;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use stream_worker::{StreamError, StreamWorker, WorkerConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

type EmailStreamWorker = StreamWorker<EmailJob, NotificationProcessor<SmtpSender>>;

/// The worker process in one startable/stoppable unit.
pub struct WorkerRuntime {
    settings: Settings,
    running: Option<Running>,
}

struct Running {
    shutdown_tx: watch::Sender<bool>,
    worker: JoinHandle<Result<(), StreamError>>,
    /// Queue connection handle; released when the runtime stops.
    redis: ConnectionManager,
}

impl WorkerRuntime {
    /// Create a stopped runtime.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            running: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Connect to the queue and start consuming.
    pub async fn start(&mut self) -> eyre::Result<()> {
        if self.running.is_some() {
            eyre::bail!("worker already started; call shutdown() first");
        }

        let client = redis::Client::open(self.settings.redis.url())
            .wrap_err("invalid Redis connection settings")?;
        let redis = ConnectionManager::new(client)
            .await
            .wrap_err("failed to connect to Redis")?;

        let templates = Arc::new(TemplateCache::new(&self.settings.template_dir));
        let sender = SmtpSender::new(self.settings.smtp.clone());
        let mailer = Mailer::new(sender, templates, self.settings.smtp.admin_address.clone());
        let processor = NotificationProcessor::new(mailer);

        let config = WorkerConfig::from_stream_def::<EmailNotificationStream>()
            .with_max_concurrent_jobs(self.settings.concurrency);

        info!(
            stream = %config.stream_name,
            group = %config.consumer_group,
            concurrency = %config.max_concurrent_jobs,
            "Starting worker runtime"
        );

        let worker: EmailStreamWorker = StreamWorker::new(redis.clone(), processor, config);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

        self.running = Some(Running {
            shutdown_tx,
            worker: handle,
            redis,
        });
        Ok(())
    }

    /// Stop consuming and release the queue connection.
    ///
    /// In-flight jobs finish their current batch before the loop exits. Safe
    /// to call when the runtime never started.
    pub async fn shutdown(&mut self) -> eyre::Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        if running.shutdown_tx.send(true).is_err() {
            warn!("Worker loop already gone before shutdown signal");
        }

        let result = running
            .worker
            .await
            .wrap_err("worker task panicked during shutdown")?;
        drop(running.redis);

        result.wrap_err("worker loop failed during shutdown")?;
        info!("Worker runtime stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::redis::RedisSettings;
    use core_config::smtp::SmtpSettings;

    fn settings() -> Settings {
        Settings {
            redis: RedisSettings::new("localhost".to_string(), 6379),
            smtp: SmtpSettings {
                host: "localhost".to_string(),
                port: 2525,
                secure: false,
                username: "mailer".to_string(),
                password: "hunter2".to_string(),
                from_address: "noreply@example.com".to_string(),
                admin_address: "admin@example.com".to_string(),
                timeout_secs: 30,
            },
            template_dir: "templates".into(),
            concurrency: 5,
        }
    }

    #[tokio::test]
    async fn test_shutdown_before_start_is_a_noop() {
        let mut runtime = WorkerRuntime::new(settings());
        assert!(!runtime.is_running());
        runtime.shutdown().await.unwrap();
        runtime.shutdown().await.unwrap();
        assert!(!runtime.is_running());
    }
}
