use super::log_entry::LogEntry;
use serde::{Deserialize, Serialize};

/// The unit of delivery to the ingestion endpoint: the authentication token
/// plus an ordered sequence of log entries.
///
/// The drain loop currently constructs exactly one entry per batch; the type
/// supports more, but no aggregation happens upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub token: String,
    pub logs: Vec<LogEntry>,
}

impl Batch {
    pub fn new(token: impl Into<String>, logs: Vec<LogEntry>) -> Self {
        Self {
            token: token.into(),
            logs,
        }
    }

    /// Builds the single-entry batch the drain loop produces per line event.
    pub fn single(token: impl Into<String>, entry: LogEntry) -> Self {
        Self::new(token, vec![entry])
    }
}
