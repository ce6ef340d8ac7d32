//! Stream consumer for Redis operations
//!
//! Handles reading, claiming, and acknowledging messages from Redis streams
//! using consumer groups, plus the trimmed completion/DLQ record streams.

use crate::config::WorkerConfig;
use crate::error::StreamError;
use crate::event::StreamEvent;
use crate::registry::{MessageKey, StreamJob};
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::streams::{StreamClaimReply, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, RedisResult};
use std::collections::HashMap;
use tracing::{debug, error, info};

/// A pending (delivered but unacknowledged) stream entry.
#[derive(Debug, Clone)]
pub struct PendingEntry {
    /// Stream entry ID
    pub id: String,
    /// Consumer currently holding the entry
    pub consumer: String,
    /// Milliseconds since the entry was last delivered
    pub idle_ms: i64,
    /// Number of times the entry has been delivered so far
    pub deliveries: i64,
}

/// Stream consumer for Redis operations
#[derive(Clone)]
pub struct StreamConsumer {
    redis: ConnectionManager,
    config: WorkerConfig,
}

impl StreamConsumer {
    /// Create a new StreamConsumer
    pub fn new(redis: ConnectionManager, config: WorkerConfig) -> Self {
        Self { redis, config }
    }

    /// Get a clone of the Redis connection
    pub fn redis(&self) -> ConnectionManager {
        self.redis.clone()
    }

    /// Get the worker configuration
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Ensure the consumer group exists.
    ///
    /// The group starts at "0" so a backlog enqueued before the first worker
    /// came up is still processed.
    pub async fn ensure_consumer_group(&self) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let result: RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => {
                info!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Created consumer group"
                );
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Consumer group already exists"
                );
                Ok(())
            }
            Err(e) => Err(StreamError::Redis(e)),
        }
    }

    /// Read new messages from the stream.
    ///
    /// Non-blocking; the worker loop handles the polling delay. Entries
    /// whose payload cannot be parsed are dead-lettered and acknowledged so
    /// they never wedge the group.
    pub async fn read_new<J: StreamJob>(&self) -> Result<Vec<StreamEvent<J>>, StreamError> {
        let mut conn = self.redis.clone();

        let opts = StreamReadOptions::default()
            .group(&self.config.consumer_group, &self.config.consumer_id)
            .count(self.config.batch_size);

        let reply: StreamReadReply = conn
            .xread_options(&[&self.config.stream_name], &[">"], &opts)
            .await
            .map_err(StreamError::Redis)?;

        let mut events = Vec::new();
        for stream_key in reply.keys {
            for entry in stream_key.ids {
                match Self::parse_job::<J>(&entry.map) {
                    Ok(job) => events.push(StreamEvent::new(entry.id, job)),
                    Err(e) => {
                        error!(
                            stream_id = %entry.id,
                            error = %e,
                            "Unparseable message, moving to DLQ"
                        );
                        if let Err(dlq_err) = self.dead_letter_raw(&entry.id, &entry.map).await {
                            error!(stream_id = %entry.id, error = %dlq_err, "Failed to dead-letter raw message");
                        }
                        let _ = self.ack(&entry.id).await;
                    }
                }
            }
        }

        Ok(events)
    }

    /// List pending entries across all consumers of the group, filtered to
    /// those idle for at least `min_idle_ms`.
    pub async fn pending(
        &self,
        min_idle_ms: u64,
        count: usize,
    ) -> Result<Vec<PendingEntry>, StreamError> {
        let mut conn = self.redis.clone();

        let result: RedisResult<Vec<(String, String, i64, i64)>> = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("IDLE")
            .arg(min_idle_ms)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await;

        match result {
            Ok(rows) => Ok(rows
                .into_iter()
                .map(|(id, consumer, idle_ms, deliveries)| PendingEntry {
                    id,
                    consumer,
                    idle_ms,
                    deliveries,
                })
                .collect()),
            Err(e) if e.to_string().contains("NOGROUP") => Ok(vec![]),
            Err(e) => Err(StreamError::Redis(e)),
        }
    }

    /// Claim a pending entry for this consumer and return it as an event.
    ///
    /// Returns `None` when the entry was already claimed elsewhere or has
    /// been deleted. The resulting delivery count includes this delivery.
    pub async fn claim<J: StreamJob>(
        &self,
        entry: &PendingEntry,
        min_idle_ms: u64,
    ) -> Result<Option<StreamEvent<J>>, StreamError> {
        let mut conn = self.redis.clone();

        let reply: StreamClaimReply = conn
            .xclaim(
                &self.config.stream_name,
                &self.config.consumer_group,
                &self.config.consumer_id,
                min_idle_ms,
                &[&entry.id],
            )
            .await
            .map_err(StreamError::Redis)?;

        let Some(claimed) = reply.ids.into_iter().next() else {
            return Ok(None);
        };

        match Self::parse_job::<J>(&claimed.map) {
            Ok(job) => Ok(Some(StreamEvent::with_delivery_count(
                claimed.id,
                job,
                entry.deliveries as u32 + 1,
            ))),
            Err(e) => {
                error!(
                    stream_id = %claimed.id,
                    error = %e,
                    "Unparseable claimed message, moving to DLQ"
                );
                if let Err(dlq_err) = self.dead_letter_raw(&claimed.id, &claimed.map).await {
                    error!(stream_id = %claimed.id, error = %dlq_err, "Failed to dead-letter raw message");
                }
                let _ = self.ack(&claimed.id).await;
                Ok(None)
            }
        }
    }

    /// Acknowledge a message
    pub async fn ack(&self, stream_id: &str) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let _: i64 = redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(stream_id)
            .query_async(&mut conn)
            .await
            .map_err(StreamError::Redis)?;

        debug!(stream_id = %stream_id, "Acknowledged message");
        Ok(())
    }

    /// Record a successful job on the trimmed completion stream.
    pub async fn record_completed(&self, job_id: &str) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let _: String = redis::cmd("XADD")
            .arg(&self.config.completed_stream)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.config.completed_retention)
            .arg("*")
            .arg(MessageKey::Job.as_ref())
            .arg(job_id)
            .arg(MessageKey::CompletedAt.as_ref())
            .arg(Utc::now().to_rfc3339())
            .query_async(&mut conn)
            .await
            .map_err(StreamError::Redis)?;

        Ok(())
    }

    /// Move an exhausted job to the trimmed dead letter queue.
    pub async fn move_to_dlq<J: StreamJob>(
        &self,
        job: &J,
        error: &str,
    ) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();
        let job_json = serde_json::to_string(job)?;

        let _: String = redis::cmd("XADD")
            .arg(&self.config.dlq_stream)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.config.failed_retention)
            .arg("*")
            .arg(MessageKey::Job.as_ref())
            .arg(&job_json)
            .arg(MessageKey::Error.as_ref())
            .arg(error)
            .arg(MessageKey::FailedAt.as_ref())
            .arg(Utc::now().to_rfc3339())
            .query_async(&mut conn)
            .await
            .map_err(StreamError::Redis)?;

        Ok(())
    }

    /// Move a raw, unparseable message to the DLQ.
    async fn dead_letter_raw(
        &self,
        stream_id: &str,
        map: &HashMap<String, redis::Value>,
    ) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let raw = Self::raw_payload(map).unwrap_or_else(|| format!("{:?}", map));

        let _: String = redis::cmd("XADD")
            .arg(&self.config.dlq_stream)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.config.failed_retention)
            .arg("*")
            .arg(MessageKey::Job.as_ref())
            .arg(&raw)
            .arg(MessageKey::Error.as_ref())
            .arg(format!("unparseable payload (original id {stream_id})"))
            .arg(MessageKey::FailedAt.as_ref())
            .arg(Utc::now().to_rfc3339())
            .query_async(&mut conn)
            .await
            .map_err(StreamError::Redis)?;

        Ok(())
    }

    /// Parse a job from a stream entry's field map.
    fn parse_job<J: StreamJob>(
        map: &HashMap<String, redis::Value>,
    ) -> Result<J, StreamError> {
        let raw = Self::raw_payload(map).ok_or_else(|| {
            StreamError::Serialization(format!(
                "missing or invalid '{}' field in message",
                MessageKey::Job.as_ref()
            ))
        })?;

        let job: J = serde_json::from_str(&raw)?;
        Ok(job)
    }

    /// Extract the serialized payload from a stream entry's field map.
    fn raw_payload(map: &HashMap<String, redis::Value>) -> Option<String> {
        match map.get(MessageKey::Job.as_ref()) {
            Some(redis::Value::BulkString(bytes)) => {
                Some(String::from_utf8_lossy(bytes).to_string())
            }
            Some(redis::Value::SimpleString(s)) => Some(s.clone()),
            _ => None,
        }
    }
}
