use tokio::signal;
use tracing::warn;

/// Exit code for a run abandoned on SIGINT/SIGTERM.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Resolves with the name of the first termination signal received.
///
/// Runs are not resumable: an interrupted run leaves incomplete `.part` files
/// behind and never advances the watermark.
pub async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
