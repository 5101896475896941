pub mod config;
pub mod logging;
pub mod service;
pub mod shutdown;

pub use config::{Config, ConfigError, LogLevel};
pub use service::{ServiceError, ServiceManager};

use clap::Parser;
use clap::error::ErrorKind;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// The running agent: validated configuration plus the shared cancellation
/// scope its activities observe.
pub struct App {
    config: Config,
    shutdown: CancellationToken,
}

impl App {
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancellation scope shared by every activity; cancel it to stop the
    /// agent from outside (tests use this in place of process signals).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs the pipeline until signal-driven cancellation or tailer death.
    /// Startup failures abort before any line is consumed.
    pub async fn run(self) -> Result<(), ServiceError> {
        info!(
            file = %self.config.file.display(),
            endpoint = %self.config.endpoint,
            "starting tailpost v{}",
            crate::VERSION
        );

        let service = ServiceManager::new(&self.config, self.shutdown.clone())?;
        service.run().await;

        info!("tailpost stopped");
        Ok(())
    }
}

/// Binary entry point: parse flags, set up logging and signal handling, run.
///
/// Exit codes: 0 on graceful shutdown (signal or tailer death), 1 on invalid
/// invocation or fatal startup error.
pub async fn main() -> ExitCode {
    let config = match Config::try_parse_from(std::env::args()) {
        Ok(config) => config,
        Err(err) => {
            // clap prints help/version on stdout and usage errors on stderr
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let config = match config.finalize() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("tailpost: {err}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(config.log_level);

    let app = App::from_config(config);
    shutdown::spawn_signal_listener(app.shutdown_token());

    match app.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("failed to start: {err}");
            ExitCode::FAILURE
        }
    }
}
