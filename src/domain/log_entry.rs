use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single log line wrapped in the ingestion envelope.
///
/// Immutable once constructed: the drain loop builds one per line event and
/// hands it to the sender without further mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub body: String,
    pub attributes: HashMap<String, String>,
}

impl LogEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        level: LogLevel,
        body: impl Into<String>,
        attributes: HashMap<String, String>,
    ) -> Self {
        Self {
            timestamp,
            level,
            body: body.into(),
            attributes,
        }
    }
}
