//! Email Worker Service - Entry Point
//!
//! Background worker that dispatches transactional emails for jobs queued on
//! the `email_notifications` stream. Exits 0 after a clean shutdown, 1 when
//! startup or shutdown failed.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    email_worker::run().await
}
