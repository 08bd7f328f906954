//! Graceful-shutdown signal handling.

use tracing::info;

/// Resolves when the process receives SIGINT (Ctrl+C) or SIGTERM.
///
/// Intended for `axum::serve(...).with_graceful_shutdown(shutdown_signal())`;
/// in-flight requests (including transactions mid-commit) run to completion
/// before the server stops accepting connections.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
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
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
