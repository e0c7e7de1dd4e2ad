//! Cache key builders for presence entries.
//!
//! Centralising key construction keeps every client, in every process,
//! agreeing on where a record's watchers live.

use watch_core::types::RecordKey;

/// Cache key for the presence entry of `record` under `prefix`.
pub fn presence(prefix: &str, record: &RecordKey) -> String {
    format!(
        "{prefix}:presence:{}:{}",
        record.object_type(),
        record.record_id()
    )
}

/// Cache key used to probe that the backend accepts writes.
pub fn health_probe(prefix: &str) -> String {
    format!("{prefix}:health")
}
