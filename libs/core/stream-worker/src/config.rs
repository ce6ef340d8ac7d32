//! Worker configuration
//!
//! This module provides `WorkerConfig` for configuring the stream worker.

use crate::registry::StreamDef;
use uuid::Uuid;

/// Configuration for the stream worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Redis stream name
    pub stream_name: String,

    /// Consumer group name
    pub consumer_group: String,

    /// Unique consumer ID (auto-generated if not provided)
    pub consumer_id: String,

    /// Dead letter queue stream name
    pub dlq_stream: String,

    /// Completion-record stream name
    pub completed_stream: String,

    /// Batch size for reading messages
    pub batch_size: usize,

    /// Poll interval in milliseconds when no messages are available
    pub poll_interval_ms: u64,

    /// Maximum concurrent jobs to process
    pub max_concurrent_jobs: usize,

    /// Idle time in milliseconds after which a delivered job counts as
    /// stalled and is reclaimed
    pub stall_timeout_ms: u64,

    /// Deliveries (first attempt included) before a job is dead-lettered
    pub max_deliveries: u32,

    /// Completion records retained on the completed stream
    pub completed_retention: usize,

    /// Failure records retained on the DLQ stream
    pub failed_retention: usize,
}

impl WorkerConfig {
    /// Create a new WorkerConfig from a StreamDef
    pub fn from_stream_def<S: StreamDef>() -> Self {
        Self {
            stream_name: S::STREAM_NAME.to_string(),
            consumer_group: S::CONSUMER_GROUP.to_string(),
            consumer_id: format!("worker-{}", Uuid::new_v4()),
            dlq_stream: S::DLQ_STREAM.to_string(),
            completed_stream: S::COMPLETED_STREAM.to_string(),
            batch_size: 10,
            poll_interval_ms: 500,
            max_concurrent_jobs: 1, // Sequential by default
            stall_timeout_ms: S::STALL_TIMEOUT_MS,
            max_deliveries: S::MAX_DELIVERIES,
            completed_retention: S::COMPLETED_RETENTION,
            failed_retention: S::FAILED_RETENTION,
        }
    }

    /// Create a new WorkerConfig with explicit values
    pub fn new(stream_name: impl Into<String>, consumer_group: impl Into<String>) -> Self {
        let stream_name = stream_name.into();
        Self {
            dlq_stream: format!("{}:dlq", stream_name),
            completed_stream: format!("{}:completed", stream_name),
            stream_name,
            consumer_group: consumer_group.into(),
            consumer_id: format!("worker-{}", Uuid::new_v4()),
            batch_size: 10,
            poll_interval_ms: 500,
            max_concurrent_jobs: 1,
            stall_timeout_ms: 30_000,
            max_deliveries: 3,
            completed_retention: 100,
            failed_retention: 50,
        }
    }

    /// Set the consumer ID
    pub fn with_consumer_id(mut self, id: impl Into<String>) -> Self {
        self.consumer_id = id.into();
        self
    }

    /// Set the DLQ stream name
    pub fn with_dlq_stream(mut self, stream: impl Into<String>) -> Self {
        self.dlq_stream = stream.into();
        self
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the poll interval
    pub fn with_poll_interval_ms(mut self, interval: u64) -> Self {
        self.poll_interval_ms = interval;
        self
    }

    /// Set the maximum concurrent jobs
    pub fn with_max_concurrent_jobs(mut self, count: usize) -> Self {
        self.max_concurrent_jobs = count.max(1);
        self
    }

    /// Set the stall timeout for reclaiming abandoned deliveries
    pub fn with_stall_timeout_ms(mut self, timeout: u64) -> Self {
        self.stall_timeout_ms = timeout;
        self
    }

    /// Set the delivery budget before dead-lettering
    pub fn with_max_deliveries(mut self, count: u32) -> Self {
        self.max_deliveries = count.max(1);
        self
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new("stream:jobs", "workers")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestStream;

    impl StreamDef for TestStream {
        const STREAM_NAME: &'static str = "test:stream";
        const CONSUMER_GROUP: &'static str = "test:group";
        const DLQ_STREAM: &'static str = "test:dlq";
        const COMPLETED_STREAM: &'static str = "test:completed";
    }

    #[test]
    fn test_from_stream_def() {
        let config = WorkerConfig::from_stream_def::<TestStream>();

        assert_eq!(config.stream_name, "test:stream");
        assert_eq!(config.consumer_group, "test:group");
        assert_eq!(config.dlq_stream, "test:dlq");
        assert_eq!(config.completed_stream, "test:completed");
        assert_eq!(config.max_deliveries, 3);
        assert_eq!(config.stall_timeout_ms, 30_000);
        assert_eq!(config.completed_retention, 100);
        assert_eq!(config.failed_retention, 50);
        assert!(config.consumer_id.starts_with("worker-"));
    }

    #[test]
    fn test_builder_pattern() {
        let config = WorkerConfig::new("my:stream", "my:group")
            .with_consumer_id("worker-1")
            .with_dlq_stream("my:dlq")
            .with_batch_size(20)
            .with_max_concurrent_jobs(5)
            .with_stall_timeout_ms(10_000)
            .with_max_deliveries(2);

        assert_eq!(config.stream_name, "my:stream");
        assert_eq!(config.consumer_id, "worker-1");
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.max_concurrent_jobs, 5);
        assert_eq!(config.stall_timeout_ms, 10_000);
        assert_eq!(config.max_deliveries, 2);
    }

    #[test]
    fn test_concurrency_floor() {
        let config = WorkerConfig::default().with_max_concurrent_jobs(0);
        assert_eq!(config.max_concurrent_jobs, 1);
    }

    #[test]
    fn test_derived_stream_names() {
        let config = WorkerConfig::new("email_notifications", "email_workers");
        assert_eq!(config.dlq_stream, "email_notifications:dlq");
        assert_eq!(config.completed_stream, "email_notifications:completed");
    }
}
