//! Suppression of redundant re-confirmation writes.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use watch_core::types::RecordKey;

/// Remembers when this client last confirmed its own mark per record.
///
/// A confirmation inside the window is known to be reflected in the store
/// already, so the reconciler skips both the read and the write.
#[derive(Debug)]
pub struct WriteDeduplicator {
    window: Duration,
    confirmed: HashMap<RecordKey, Instant>,
}

impl WriteDeduplicator {
    /// Create a deduplicator with the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            confirmed: HashMap::new(),
        }
    }

    /// Whether `key` was confirmed within the window.
    pub fn is_recent(&self, key: &RecordKey) -> bool {
        self.confirmed
            .get(key)
            .is_some_and(|at| at.elapsed() < self.window)
    }

    /// Record a confirmation of `key` now.
    pub fn record(&mut self, key: &RecordKey) {
        self.confirmed.insert(key.clone(), Instant::now());
    }

    /// Forget `key`, e.g. after unwatching it.
    pub fn forget(&mut self, key: &RecordKey) {
        self.confirmed.remove(key);
    }

    /// Drop entries that fell out of the window.
    pub fn cleanup(&mut self) {
        let window = self.window;
        self.confirmed.retain(|_, at| at.elapsed() < window);
    }
}
