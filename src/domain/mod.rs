//! Domain layer for tailpost.
//!
//! Contains the canonical types shared across all modules:
//! - `LogEntry`: one forwarded log line with its envelope fields
//! - `LogLevel`: wire-level log severity (TRACE through FATAL)
//! - `Batch`: the unit of delivery to the ingestion endpoint

pub mod batch;
pub mod log_entry;
pub mod log_level;

pub use batch::Batch;
pub use log_entry::LogEntry;
pub use log_level::LogLevel;
