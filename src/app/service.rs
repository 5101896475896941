use super::Config;
use crate::domain::{Batch, LogEntry, LogLevel};
use crate::sender::{HttpSender, ReqwestTransport, SendError};
use crate::tailer::{LineEvent, TailConfig, Tailer, TailerDeath, TailerError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),
    #[error("Tailer error: {0}")]
    Tailer(#[from] TailerError),
    #[error("Sender error: {0}")]
    Sender(#[from] SendError),
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Wires tailer output to sender input with cooperative shutdown.
///
/// Two activities share one cancellation scope: the drain activity forwards
/// line events one batch at a time, the shutdown-watch activity turns
/// external cancellation or tailer death into a scope-wide stop.
pub struct ServiceManager {
    token: String,
    sender: Arc<HttpSender<ReqwestTransport>>,
    tailer: Tailer,
    shutdown: CancellationToken,
}

impl ServiceManager {
    /// Builds the sender and starts the tailer. Any failure here is fatal:
    /// the process must not partially run.
    pub fn new(config: &Config, shutdown: CancellationToken) -> Result<Self, ServiceError> {
        let url = config.ingest_url()?;
        let transport = ReqwestTransport::new(config.request_timeout)?;
        let sender = HttpSender::new(transport, url.as_str())?;

        let tailer = Tailer::spawn(
            TailConfig {
                path: config.file.clone(),
                start_offset: 0,
                poll_interval: config.poll_interval,
            },
            shutdown.clone(),
        )?;

        Ok(Self {
            token: config.token.clone(),
            sender: Arc::new(sender),
            tailer,
            shutdown,
        })
    }

    /// Runs until external cancellation or tailer death, then returns after
    /// both activities have stopped.
    pub async fn run(self) {
        let (lines, death) = self.tailer.into_parts();

        let drain = tokio::spawn(drain_activity(
            lines,
            death.clone(),
            self.sender,
            self.token,
            self.shutdown.clone(),
        ));
        let shutdown_watch = tokio::spawn(shutdown_watch_activity(death, self.shutdown));

        let _ = tokio::join!(drain, shutdown_watch);
    }
}

/// Forwards line events to the sender in file order, one batch in flight at
/// a time. Delivery failures are logged and the next line is attempted; they
/// are not retried and do not stop the pipeline.
async fn drain_activity(
    mut lines: mpsc::Receiver<LineEvent>,
    mut death: watch::Receiver<Option<TailerDeath>>,
    sender: Arc<HttpSender<ReqwestTransport>>,
    token: String,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                debug!("drain activity stopped by cancellation");
                return;
            }
            died = async {
                death
                    .wait_for(|death| death.is_some())
                    .await
                    .map(|death| death.clone())
            } => {
                let cause = died
                    .ok()
                    .and_then(|death| death.map(|death| death.cause));
                info!(cause = cause.as_deref().unwrap_or("unknown"), "file tailer died");
                return;
            }
            event = lines.recv() => {
                let Some(event) = event else {
                    debug!("line channel closed, drain activity exiting");
                    return;
                };
                let batch = Batch::single(
                    token.clone(),
                    LogEntry::new(event.timestamp, LogLevel::Info, event.text, HashMap::new()),
                );
                match sender.deliver(&batch, &shutdown).await {
                    Ok(()) => debug!("delivered batch of 1 entry"),
                    Err(SendError::Canceled) => {
                        debug!("delivery canceled by shutdown");
                        return;
                    }
                    Err(err) => warn!(error = %err, "failed to deliver batch"),
                }
            }
        }
    }
}

/// Waits for external cancellation or tailer death and propagates either to
/// the shared scope.
async fn shutdown_watch_activity(
    mut death: watch::Receiver<Option<TailerDeath>>,
    shutdown: CancellationToken,
) {
    tokio::select! {
        biased;
        () = shutdown.cancelled() => {}
        died = death.wait_for(|death| death.is_some()) => {
            let cause = died
                .ok()
                .and_then(|death| death.clone().map(|death| death.cause));
            info!(
                cause = cause.as_deref().unwrap_or("unknown"),
                "tailer death triggered shutdown"
            );
        }
    }
    shutdown.cancel();
}
