use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Level for the agent's own diagnostics, distinct from the wire-level
/// severity attached to forwarded entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Default ingestion path appended when the endpoint is a bare host name.
const DEFAULT_INGEST_PATH: &str = "/api/message";

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(
    name = "tailpost",
    version,
    about = "Tails a log file and forwards appended lines to an HTTP ingestion endpoint"
)]
pub struct Config {
    /// Path to the log file to monitor
    #[arg(long, short = 'f', env = "TAILPOST_FILE")]
    pub file: PathBuf,

    /// Authentication token embedded in every batch
    #[arg(long, short = 't', env = "TAILPOST_TOKEN")]
    pub token: String,

    /// Endpoint for log ingestion: a full URL, or a bare host name that gets
    /// a scheme and the default ingestion path
    #[arg(
        long,
        short = 'e',
        env = "TAILPOST_ENDPOINT",
        default_value = "ingress.tailpost.example"
    )]
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Send logs over HTTP instead of HTTPS (bare host endpoints only)
    #[arg(long, short = 'i', env = "TAILPOST_INSECURE")]
    #[serde(default)]
    pub insecure: bool,

    /// Log level for the agent's own diagnostics
    #[arg(long, env = "TAILPOST_LOG_LEVEL", default_value = "info")]
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    /// File poll interval in milliseconds
    #[arg(long, env = "TAILPOST_POLL_INTERVAL_MS", default_value = "200")]
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "TAILPOST_REQUEST_TIMEOUT_SECS", default_value = "30")]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Configuration file path (optional, replaces flag values when set)
    #[arg(long, env = "TAILPOST_CONFIG_FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub poll_interval: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub request_timeout: Duration,
}

fn default_endpoint() -> String {
    "ingress.tailpost.example".to_string()
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Resolves the parsed flags into a validated configuration, loading the
    /// config file when one was named.
    pub fn finalize(self) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = &self.config_file {
            Self::from_file(path)?
        } else {
            self
        };
        config.post_process();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    fn post_process(&mut self) {
        self.poll_interval = Duration::from_millis(self.poll_interval_ms);
        self.request_timeout = Duration::from_secs(self.request_timeout_secs);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Token must not be empty".to_string(),
            ));
        }
        if self.file.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "File path must not be empty".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Poll interval must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }
        self.ingest_url()?;
        Ok(())
    }

    /// Full ingestion URL: endpoints carrying a scheme are used verbatim;
    /// bare host names get `https://` (or `http://` with `--insecure`) and
    /// the default ingestion path.
    pub fn ingest_url(&self) -> Result<Url, ConfigError> {
        let raw = if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else {
            let scheme = if self.insecure { "http" } else { "https" };
            format!("{scheme}://{}{DEFAULT_INGEST_PATH}", self.endpoint)
        };
        Url::parse(&raw).map_err(|err| {
            ConfigError::InvalidUrl(format!("invalid endpoint '{}': {err}", self.endpoint))
        })
    }
}
