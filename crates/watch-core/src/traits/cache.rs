//! Key-value cache contract underneath the presence store.

use std::time::Duration;

use async_trait::async_trait;

use crate::result::AppResult;

/// String key-value backend with per-entry expiry.
///
/// Values are opaque to the backend; the presence store decides how they
/// are encoded. Backend failures map to `StoreUnavailable`, a backend
/// that cannot exist at all (bad URL, disabled feature) to
/// `CacheCapability`.
#[async_trait]
pub trait CacheProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Value under `key`, or `None` when missing or expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Store `value` under `key` for `ttl`, replacing any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Delete `key`. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> AppResult<()>;

    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Round-trip to the backend. `Ok(false)` means it answered but is
    /// not usable.
    async fn ping(&self) -> AppResult<bool>;
}
