//! Email worker composition root.
//!
//! Wires configuration, the notification domain, and the stream worker
//! framework together, and owns the signal-to-shutdown glue. The runtime
//! itself ([`runtime::WorkerRuntime`]) stays free of process-exit concerns
//! so it can be driven from tests.

pub mod runtime;
pub mod settings;

use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use runtime::WorkerRuntime;
use settings::Settings;
use tracing::info;

/// Run the worker until a termination signal arrives.
///
/// The exit-code decision lives with the caller: `main` exits 0 when this
/// returns `Ok` and 1 when startup or shutdown failed.
pub async fn run() -> eyre::Result<()> {
    install_color_eyre();
    let environment = Environment::from_env();
    init_tracing(&environment);

    let settings = Settings::from_env()?;
    let mut runtime = WorkerRuntime::new(settings);
    runtime.start().await?;

    shutdown_signal().await;
    info!("Termination signal received, shutting down");

    runtime.shutdown().await?;
    info!("Shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
