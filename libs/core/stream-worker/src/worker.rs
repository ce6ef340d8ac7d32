//! The generic StreamWorker implementation.
//!
//! `StreamWorker<J, P>` owns the consumption loop: it reads batches from the
//! stream, fans jobs out to the processor under a concurrency bound, and
//! applies the retry policy. Processors never retry; a failed delivery stays
//! pending and is redelivered by the stalled-recovery pass until its
//! delivery budget is spent, at which point it is dead-lettered.

use crate::config::WorkerConfig;
use crate::consumer::StreamConsumer;
use crate::error::StreamError;
use crate::event::StreamEvent;
use crate::registry::{StreamJob, StreamProcessor};
use redis::aio::ConnectionManager;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Generic stream worker that processes jobs using a processor.
///
/// # Type Parameters
///
/// * `J` - The job type (must implement `StreamJob`)
/// * `P` - The processor type (must implement `StreamProcessor<J>`)
///
/// # Concurrency
///
/// By default, jobs are processed sequentially (`max_concurrent_jobs = 1`).
/// For higher throughput with independent jobs, increase this value:
///
/// ```rust,ignore
/// let config = WorkerConfig::new("email_notifications", "email_workers")
///     .with_max_concurrent_jobs(5);
/// ```
pub struct StreamWorker<J, P>
where
    J: StreamJob,
    P: StreamProcessor<J>,
{
    consumer: StreamConsumer,
    processor: Arc<P>,
    config: WorkerConfig,
    /// Semaphore to limit concurrent job processing
    concurrency: Arc<Semaphore>,
    _phantom: PhantomData<J>,
}

impl<J, P> StreamWorker<J, P>
where
    J: StreamJob + 'static,
    P: StreamProcessor<J> + 'static,
{
    /// Create a new stream worker.
    pub fn new(redis: ConnectionManager, processor: P, config: WorkerConfig) -> Self {
        Self::with_arc_processor(redis, Arc::new(processor), config)
    }

    /// Create a new stream worker with an Arc processor.
    pub fn with_arc_processor(
        redis: ConnectionManager,
        processor: Arc<P>,
        config: WorkerConfig,
    ) -> Self {
        let consumer = StreamConsumer::new(redis, config.clone());
        let concurrency = Arc::new(Semaphore::new(config.max_concurrent_jobs));

        Self {
            consumer,
            processor,
            concurrency,
            config,
            _phantom: PhantomData,
        }
    }

    /// Get a reference to the consumer.
    pub fn consumer(&self) -> &StreamConsumer {
        &self.consumer
    }

    /// Run the worker loop.
    ///
    /// This continuously reads jobs from the stream and processes them.
    /// Use the shutdown receiver to gracefully stop the worker; jobs already
    /// handed to the processor finish before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), StreamError> {
        info!(
            consumer_id = %self.config.consumer_id,
            stream = %self.config.stream_name,
            group = %self.config.consumer_group,
            processor = %self.processor.name(),
            "Starting stream worker"
        );

        self.consumer.ensure_consumer_group().await?;

        // Recover everything left pending by a previous incarnation of this
        // worker before accepting new jobs.
        match self.recover_pending(0).await {
            Ok(0) => {}
            Ok(count) => info!(count = count, "Recovered pending jobs on startup"),
            Err(e) => warn!(error = %e, "Failed to recover pending jobs on startup"),
        }

        info!(
            stream = %self.config.stream_name,
            max_concurrent_jobs = %self.config.max_concurrent_jobs,
            batch_size = %self.config.batch_size,
            poll_interval_ms = %self.config.poll_interval_ms,
            "Worker ready"
        );

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let stall_interval = Duration::from_millis(self.config.stall_timeout_ms);
        let mut last_stall_check = std::time::Instant::now();

        // Track consecutive errors for exponential backoff
        let mut consecutive_errors: u32 = 0;
        const MAX_BACKOFF_SECS: u64 = 30;

        loop {
            // Check for shutdown signal
            if *shutdown.borrow() {
                info!("Received shutdown signal, stopping worker");
                break;
            }

            match self.process_batch().await {
                Ok(_) => {
                    if consecutive_errors > 0 {
                        info!("Connection recovered after {} errors", consecutive_errors);
                        consecutive_errors = 0;
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;

                    if e.is_nogroup_error() {
                        warn!("Consumer group missing, recreating...");
                        if let Err(create_err) = self.consumer.ensure_consumer_group().await {
                            error!(error = %create_err, "Failed to recreate consumer group");
                        }
                    } else if e.is_connection_error() {
                        let backoff_secs = std::cmp::min(
                            2u64.pow(consecutive_errors.min(5)),
                            MAX_BACKOFF_SECS,
                        );
                        warn!(
                            error = %e,
                            consecutive_errors = %consecutive_errors,
                            backoff_secs = %backoff_secs,
                            "Redis connection error, backing off"
                        );
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    } else {
                        error!(error = %e, "Error processing batch");
                    }

                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            }

            // Periodically redeliver stalled and failed jobs
            if last_stall_check.elapsed() >= stall_interval {
                if let Err(e) = self.recover_pending(self.config.stall_timeout_ms).await {
                    debug!(error = %e, "Error recovering stalled jobs");
                }
                last_stall_check = std::time::Instant::now();
            }

            // Wait before the next poll, but react to shutdown immediately
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Received shutdown signal, stopping worker");
                        break;
                    }
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }

        info!("Stream worker stopped");
        Ok(())
    }

    /// Read and process one batch of new messages.
    async fn process_batch(&self) -> Result<(), StreamError> {
        let events = self.consumer.read_new::<J>().await?;
        if events.is_empty() {
            return Ok(());
        }

        debug!(count = events.len(), "Received new messages");
        self.process_many(events).await;
        Ok(())
    }

    /// Process events concurrently under the configured concurrency bound.
    async fn process_many(&self, events: Vec<StreamEvent<J>>) {
        let mut join_set: JoinSet<()> = JoinSet::new();

        for event in events {
            let semaphore = Arc::clone(&self.concurrency);
            let processor = Arc::clone(&self.processor);
            let consumer = self.consumer.clone();
            let max_deliveries = self.config.max_deliveries;

            join_set.spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                Self::process_one(&processor, &consumer, max_deliveries, event).await;
            });
        }

        // Wait for the whole batch before reading the next one
        while join_set.join_next().await.is_some() {}
    }

    /// Process a single delivery and apply the retry policy.
    async fn process_one(
        processor: &Arc<P>,
        consumer: &StreamConsumer,
        max_deliveries: u32,
        event: StreamEvent<J>,
    ) {
        // A job that kept stalling without ever failing cleanly still runs
        // out of budget here.
        if event.delivery_count > max_deliveries {
            warn!(
                stream_id = %event.stream_id,
                job_id = %event.job_id(),
                deliveries = %event.delivery_count,
                "Job exceeded its delivery budget, dead-lettering without processing"
            );
            Self::dead_letter(consumer, &event, "delivery budget exhausted").await;
            return;
        }

        debug!(
            stream_id = %event.stream_id,
            job_id = %event.job_id(),
            attempt = %event.delivery_count,
            "Job started"
        );

        match processor.process(&event).await {
            Ok(()) => {
                info!(
                    stream_id = %event.stream_id,
                    job_id = %event.job_id(),
                    "Job completed"
                );

                if let Err(e) = consumer.ack(&event.stream_id).await {
                    error!(stream_id = %event.stream_id, error = %e, "Failed to ACK message");
                }
                if let Err(e) = consumer.record_completed(&event.job_id()).await {
                    debug!(stream_id = %event.stream_id, error = %e, "Failed to record completion");
                }
            }
            Err(e) => {
                error!(
                    stream_id = %event.stream_id,
                    job_id = %event.job_id(),
                    attempt = %event.delivery_count,
                    error = %e,
                    "Job failed"
                );

                if event.delivery_count >= max_deliveries {
                    warn!(
                        stream_id = %event.stream_id,
                        job_id = %event.job_id(),
                        max_deliveries = %max_deliveries,
                        "Job exhausted its delivery budget, moving to DLQ"
                    );
                    Self::dead_letter(consumer, &event, &e.to_string()).await;
                }
                // Otherwise leave the entry unacknowledged; the stalled
                // recovery pass redelivers it once it has been idle long
                // enough.
            }
        }
    }

    /// Write a DLQ record for the event and acknowledge the original entry.
    async fn dead_letter(consumer: &StreamConsumer, event: &StreamEvent<J>, reason: &str) {
        if let Err(e) = consumer.move_to_dlq(&event.job, reason).await {
            error!(stream_id = %event.stream_id, error = %e, "Failed to move job to DLQ");
            // Leave the entry pending so the job is not silently lost
            return;
        }
        if let Err(e) = consumer.ack(&event.stream_id).await {
            error!(stream_id = %event.stream_id, error = %e, "Failed to ACK dead-lettered message");
        }
    }

    /// Reclaim pending entries idle for at least `min_idle_ms` and process
    /// them. With `min_idle_ms == 0` this recovers everything pending, which
    /// is used once on startup.
    async fn recover_pending(&self, min_idle_ms: u64) -> Result<usize, StreamError> {
        let entries = self
            .consumer
            .pending(min_idle_ms, self.config.batch_size.max(100))
            .await?;

        if entries.is_empty() {
            return Ok(0);
        }

        let mut events = Vec::new();
        for entry in entries {
            if min_idle_ms > 0 {
                if entry.consumer != self.config.consumer_id {
                    // Abandoned by another (likely dead) consumer
                    warn!(
                        stream_id = %entry.id,
                        consumer = %entry.consumer,
                        idle_ms = %entry.idle_ms,
                        deliveries = %entry.deliveries,
                        "Job stalled, reclaiming"
                    );
                } else {
                    debug!(
                        stream_id = %entry.id,
                        deliveries = %entry.deliveries,
                        "Redelivering failed job"
                    );
                }
            }

            match self.consumer.claim::<J>(&entry, min_idle_ms).await {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => {
                    warn!(stream_id = %entry.id, error = %e, "Failed to claim pending entry");
                }
            }
        }

        let count = events.len();
        self.process_many(events).await;
        Ok(count)
    }
}
