use serde::{Deserialize, Serialize};

/// Wire-level log severity attached to each forwarded entry.
///
/// This is distinct from the tracing level used to configure the agent's own
/// diagnostics. It is serialized as the upper-case names the ingestion
/// endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_uppercase_names() {
        assert_eq!(serde_json::to_string(&LogLevel::Trace).unwrap(), "\"TRACE\"");
        assert_eq!(serde_json::to_string(&LogLevel::Warning).unwrap(), "\"WARNING\"");
        assert_eq!(serde_json::to_string(&LogLevel::Fatal).unwrap(), "\"FATAL\"");
    }

    #[test]
    fn deserializes_from_uppercase_names() {
        let level: LogLevel = serde_json::from_str("\"INFO\"").unwrap();
        assert_eq!(level, LogLevel::Info);
    }
}
