//! Shared watcher state for one record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Which users currently watch a record, with the time each last
/// confirmed it.
///
/// The mapping makes a second mark for the same user an overwrite, so a
/// user id can never appear twice in one entry. Serialized as a plain
/// `userId -> timestamp` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresenceEntry {
    watchers: BTreeMap<UserId, DateTime<Utc>>,
}

impl PresenceEntry {
    /// An entry with no watchers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `user` as watching at `at`. Returns the previous mark, if any.
    pub fn mark(&mut self, user: UserId, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.watchers.insert(user, at)
    }

    /// Remove `user`. Returns `true` if the user was present.
    pub fn evict(&mut self, user: &UserId) -> bool {
        self.watchers.remove(user).is_some()
    }

    /// The last confirmation time of `user`.
    pub fn last_seen(&self, user: &UserId) -> Option<DateTime<Utc>> {
        self.watchers.get(user).copied()
    }

    /// Whether `user` has a mark in this entry.
    pub fn contains(&self, user: &UserId) -> bool {
        self.watchers.contains_key(user)
    }

    /// Whether no user watches the record.
    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// Number of watchers.
    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    /// Iterate watchers in user id order.
    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &DateTime<Utc>)> {
        self.watchers.iter()
    }

    /// Watcher ids other than `local`, in user id order.
    pub fn others(&self, local: &UserId) -> Vec<UserId> {
        self.watchers
            .keys()
            .filter(|id| *id != local)
            .cloned()
            .collect()
    }
}
