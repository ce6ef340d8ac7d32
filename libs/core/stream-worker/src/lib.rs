//! Stream Worker Framework
//!
//! A generic Redis Streams worker framework for processing background jobs.
//!
//! ## Features
//!
//! - **Generic worker**: `StreamWorker<J, P>` processes any job type
//! - **Consumer groups**: horizontal scaling with Redis consumer groups
//! - **Bounded concurrency**: semaphore-limited concurrent job processing
//! - **Retries**: failed deliveries are redelivered by the stalled-recovery
//!   pass until the delivery budget is spent
//! - **Dead Letter Queue**: exhausted jobs moved to a trimmed DLQ stream
//! - **Graceful shutdown**: in-flight jobs finish before the loop exits
//!
//! ## Example
//!
//! ```ignore
//! use stream_worker::{StreamWorker, StreamJob, StreamProcessor, StreamDef, WorkerConfig};
//!
//! // Define your job type
//! #[derive(Clone, Serialize, Deserialize)]
//! struct MyJob { /* ... */ }
//!
//! impl StreamJob for MyJob { /* ... */ }
//!
//! // Define your stream
//! struct MyStream;
//! impl StreamDef for MyStream {
//!     const STREAM_NAME: &'static str = "my:jobs";
//!     const CONSUMER_GROUP: &'static str = "my_workers";
//!     const DLQ_STREAM: &'static str = "my:dlq";
//!     const COMPLETED_STREAM: &'static str = "my:completed";
//! }
//!
//! // Create processor and run
//! let config = WorkerConfig::from_stream_def::<MyStream>();
//! let worker = StreamWorker::new(redis, processor, config);
//! worker.run(shutdown_rx).await?;
//! ```

mod config;
mod consumer;
mod error;
mod event;
mod registry;
mod worker;

// Re-export main types
pub use config::WorkerConfig;
pub use consumer::{PendingEntry, StreamConsumer};
pub use error::StreamError;
pub use event::StreamEvent;
pub use registry::{MessageKey, StreamDef, StreamJob, StreamProcessor};
pub use worker::StreamWorker;
