use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Listens for process interrupt signals and cancels the shared scope,
/// which halts the drain activity and aborts any in-flight delivery.
pub fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm = match unix_signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(err) => {
                    error!("Failed to create SIGTERM handler: {err}");
                    return;
                }
            };

            tokio::select! {
                result = signal::ctrl_c() => {
                    match result {
                        Ok(()) => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
                        Err(err) => {
                            error!("Failed to listen for SIGINT: {err}");
                            return;
                        }
                    }
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            match signal::ctrl_c().await {
                Ok(()) => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
                Err(err) => {
                    error!("Failed to listen for SIGINT: {err}");
                    return;
                }
            }
        }

        shutdown.cancel();
    });
}
