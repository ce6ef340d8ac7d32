//! Stream registry types and definitions.
//!
//! This module provides:
//! - `StreamDef` trait for domain-specific stream definitions
//! - `StreamJob` and `StreamProcessor` traits for job payloads and handlers
//! - `MessageKey` enum for standard message field keys

use crate::error::StreamError;
use crate::event::StreamEvent;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Stream definition trait.
///
/// Each domain implements this trait to define their stream configuration.
/// This enables type-safe stream configuration and consistent naming
/// conventions.
///
/// # Example
///
/// ```rust,ignore
/// use stream_worker::StreamDef;
///
/// pub struct EmailStream;
///
/// impl StreamDef for EmailStream {
///     const STREAM_NAME: &'static str = "email_notifications";
///     const CONSUMER_GROUP: &'static str = "email_workers";
///     const DLQ_STREAM: &'static str = "email_notifications:dlq";
///     const COMPLETED_STREAM: &'static str = "email_notifications:completed";
/// }
/// ```
pub trait StreamDef: Send + Sync {
    /// The Redis stream name the producer enqueues to.
    const STREAM_NAME: &'static str;

    /// The consumer group name for this stream.
    const CONSUMER_GROUP: &'static str;

    /// The dead letter queue stream name for exhausted jobs.
    const DLQ_STREAM: &'static str;

    /// The stream holding completion records for processed jobs.
    const COMPLETED_STREAM: &'static str;

    /// Deliveries (first attempt included) before a job is dead-lettered.
    const MAX_DELIVERIES: u32 = 3;

    /// Idle time after which a delivered-but-unfinished job counts as
    /// stalled and becomes eligible for re-delivery.
    const STALL_TIMEOUT_MS: u64 = 30_000;

    /// Completion records retained on the completed stream.
    const COMPLETED_RETENTION: usize = 100;

    /// Failure records retained on the DLQ stream.
    const FAILED_RETENTION: usize = 50;

    /// Get the stream name.
    fn stream_name() -> &'static str {
        Self::STREAM_NAME
    }

    /// Get the consumer group name.
    fn consumer_group() -> &'static str {
        Self::CONSUMER_GROUP
    }

    /// Get the DLQ stream name.
    fn dlq_stream() -> &'static str {
        Self::DLQ_STREAM
    }

    /// Get the completed stream name.
    fn completed_stream() -> &'static str {
        Self::COMPLETED_STREAM
    }
}

/// Trait for stream job payloads.
///
/// Domain models that represent jobs in a stream implement this trait.
/// Payloads are plain serde types; delivery bookkeeping (attempt counts)
/// lives with the stream entry, not the payload, so jobs round-trip the
/// producer's JSON unchanged.
pub trait StreamJob: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Identifier used to correlate log lines and completion records.
    fn job_id(&self) -> String;
}

/// Trait for job processors.
///
/// Domain handlers implement this trait to process jobs from the stream.
///
/// # Example
///
/// ```rust,ignore
/// use stream_worker::{StreamEvent, StreamProcessor, StreamError};
///
/// struct EmailProcessor { /* ... */ }
///
/// #[async_trait]
/// impl StreamProcessor<EmailJob> for EmailProcessor {
///     async fn process(&self, event: &StreamEvent<EmailJob>) -> Result<(), StreamError> {
///         self.mailer.send(&event.job).await?;
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "EmailProcessor"
///     }
/// }
/// ```
#[async_trait]
pub trait StreamProcessor<J: StreamJob>: Send + Sync {
    /// Process a single delivery.
    ///
    /// Return `Ok(())` for success, `Err` for failure. Failed deliveries are
    /// re-delivered or dead-lettered by the worker; implementations must not
    /// retry internally.
    async fn process(&self, event: &StreamEvent<J>) -> Result<(), StreamError>;

    /// Get the processor name for logging.
    fn name(&self) -> &'static str;
}

/// Standard message keys used in stream entries.
///
/// These are the common field names used when adding messages to Redis
/// streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MessageKey {
    /// The job payload (JSON serialized).
    Job,
    /// The error message attached to a dead-lettered job.
    Error,
    /// Timestamp when a job was dead-lettered.
    FailedAt,
    /// Timestamp when a job finished successfully.
    CompletedAt,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_key() {
        assert_eq!(MessageKey::Job.to_string(), "job");
        assert_eq!(MessageKey::Error.as_ref(), "error");
        assert_eq!(MessageKey::FailedAt.as_ref(), "failed_at");
        assert_eq!(MessageKey::CompletedAt.as_ref(), "completed_at");
    }

    #[test]
    fn test_message_key_parse() {
        let key: MessageKey = "job".parse().unwrap();
        assert_eq!(key, MessageKey::Job);
    }

    struct TestStream;
    impl StreamDef for TestStream {
        const STREAM_NAME: &'static str = "test:stream";
        const CONSUMER_GROUP: &'static str = "test_workers";
        const DLQ_STREAM: &'static str = "test:dlq";
        const COMPLETED_STREAM: &'static str = "test:completed";
    }

    #[test]
    fn test_stream_def() {
        assert_eq!(TestStream::stream_name(), "test:stream");
        assert_eq!(TestStream::consumer_group(), "test_workers");
        assert_eq!(TestStream::dlq_stream(), "test:dlq");
        assert_eq!(TestStream::completed_stream(), "test:completed");
        assert_eq!(TestStream::MAX_DELIVERIES, 3);
        assert_eq!(TestStream::STALL_TIMEOUT_MS, 30_000);
        assert_eq!(TestStream::COMPLETED_RETENTION, 100);
        assert_eq!(TestStream::FAILED_RETENTION, 50);
    }
}
