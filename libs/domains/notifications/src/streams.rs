//! Stream definitions for the notifications domain.

use stream_worker::StreamDef;

/// Email notification jobs stream definition.
///
/// The producer enqueues purchase notification jobs here; the email worker
/// consumes them. Completed and failed records are trimmed so the most
/// recent 100 completions and 50 failures remain inspectable.
pub struct EmailNotificationStream;

impl StreamDef for EmailNotificationStream {
    const STREAM_NAME: &'static str = "email_notifications";

    const CONSUMER_GROUP: &'static str = "email_workers";

    const DLQ_STREAM: &'static str = "email_notifications:dlq";

    const COMPLETED_STREAM: &'static str = "email_notifications:completed";
}
