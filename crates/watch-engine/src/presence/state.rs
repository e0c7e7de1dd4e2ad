//! Process-local memory of what this client last wrote.

use std::collections::BTreeSet;

use watch_core::types::RecordKey;

/// What the reconciler believes it has marked in the store.
///
/// Never persisted. A new session starts empty and rebuilds it from the
/// first snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewingState {
    /// The record the user currently looks at.
    pub focused: Option<RecordKey>,
    /// Records carrying a confirmed watch mark from this client.
    pub watched: BTreeSet<RecordKey>,
}

impl ViewingState {
    /// Whether this client believes it watches `key`.
    pub fn is_watching(&self, key: &RecordKey) -> bool {
        self.watched.contains(key)
    }

    /// Watched records other than `keep`.
    pub fn stale(&self, keep: Option<&RecordKey>) -> Vec<RecordKey> {
        self.watched
            .iter()
            .filter(|key| Some(*key) != keep)
            .cloned()
            .collect()
    }
}
