//! Presence store contract.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{PresenceEntry, RecordKey};

/// Shared store of presence entries, one per record.
///
/// The store is the single source of truth shared by every client. It
/// offers no transaction across keys and no compare-and-swap: a `get`
/// followed by a `put` on the same key may interleave with another
/// client's, and the later `put` wins.
#[async_trait]
pub trait PresenceStore: Send + Sync + std::fmt::Debug + 'static {
    /// Read the entry for `key`. `None` if no bucket exists.
    async fn get(&self, key: &RecordKey) -> AppResult<Option<PresenceEntry>>;

    /// Replace the entry for `key`, creating the bucket if needed.
    async fn put(&self, key: &RecordKey, entry: &PresenceEntry) -> AppResult<()>;

    /// Delete the bucket for `key`. Deleting a missing bucket is not an error.
    async fn remove(&self, key: &RecordKey) -> AppResult<()>;

    /// Whether the shared cache capability exists and answers.
    async fn health_check(&self) -> AppResult<bool>;
}
