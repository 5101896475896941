use super::config::LogLevel;
use tracing_subscriber::EnvFilter;

/// Initializes the diagnostic subscriber. `RUST_LOG` overrides the
/// configured level; repeated calls are harmless so tests can share it.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing::Level::from(level).to_string()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
