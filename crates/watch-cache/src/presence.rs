//! Presence store backed by a key-value cache.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use watch_core::config::cache::CacheConfig;
use watch_core::result::AppResult;
use watch_core::traits::cache::CacheProvider;
use watch_core::traits::store::PresenceStore;
use watch_core::types::{PresenceEntry, RecordKey};

use crate::keys;
use crate::provider::CacheManager;

/// [`PresenceStore`] that keeps each record's entry as a JSON
/// `userId -> timestamp` object under its own cache key.
#[derive(Debug, Clone)]
pub struct CachePresenceStore {
    cache: CacheManager,
    prefix: String,
    ttl: Duration,
}

impl CachePresenceStore {
    /// Wrap a cache manager.
    pub fn new(cache: CacheManager, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
            ttl,
        }
    }

    /// Build the configured cache backend and wrap it.
    pub async fn from_config(config: &CacheConfig) -> AppResult<Self> {
        let cache = CacheManager::new(config).await?;
        Ok(Self::new(
            cache,
            config.key_prefix.clone(),
            config.entry_ttl(),
        ))
    }
}

#[async_trait]
impl PresenceStore for CachePresenceStore {
    async fn get(&self, key: &RecordKey) -> AppResult<Option<PresenceEntry>> {
        let cache_key = keys::presence(&self.prefix, key);
        let Some(raw) = self.cache.get(&cache_key).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<PresenceEntry>(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                // Only a later write can repair it.
                warn!(record = %key, error = %e, "Discarding unreadable presence entry");
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &RecordKey, entry: &PresenceEntry) -> AppResult<()> {
        let cache_key = keys::presence(&self.prefix, key);
        let raw = serde_json::to_string(entry)?;
        debug!(record = %key, watchers = entry.len(), "Writing presence entry");
        self.cache.set(&cache_key, &raw, self.ttl).await
    }

    async fn remove(&self, key: &RecordKey) -> AppResult<()> {
        let cache_key = keys::presence(&self.prefix, key);
        debug!(record = %key, "Removing presence bucket");
        self.cache.delete(&cache_key).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        let probe = keys::health_probe(&self.prefix);
        if !self.cache.ping().await? {
            return Ok(false);
        }
        self.cache.set(&probe, "ok", self.ttl).await?;
        self.cache.exists(&probe).await
    }
}
