//! In-memory cache implementation using the moka crate.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use watch_core::config::cache::MemoryCacheConfig;
use watch_core::result::AppResult;
use watch_core::traits::cache::CacheProvider;

/// A cached value together with its own TTL.
#[derive(Debug, Clone)]
struct Slot {
    value: String,
    ttl: Duration,
}

/// Per-entry expiry: each slot lives for the TTL it was written with.
struct SlotExpiry;

impl Expiry<String, Slot> for SlotExpiry {
    fn expire_after_create(&self, _key: &String, slot: &Slot, _now: Instant) -> Option<Duration> {
        Some(slot.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        slot: &Slot,
        _now: Instant,
        _current: Option<Duration>,
    ) -> Option<Duration> {
        Some(slot.ttl)
    }
}

/// In-memory cache provider using moka.
///
/// Shared by every session in the process, which makes it the natural
/// store for single-node deployments and tests.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    /// The underlying moka cache.
    cache: Cache<String, Slot>,
    /// Upper bound on any entry's lifetime.
    max_ttl: Duration,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(SlotExpiry)
            .build();

        Self {
            cache,
            max_ttl: Duration::from_secs(config.time_to_live_seconds),
        }
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache.get(key).await.map(|slot| slot.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let slot = Slot {
            value: value.to_string(),
            ttl: ttl.min(self.max_ttl),
        };
        self.cache.insert(key.to_string(), slot).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.remove(key).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.cache.contains_key(key))
    }

    async fn ping(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(ceiling_secs: u64) -> MemoryCacheProvider {
        MemoryCacheProvider::new(&MemoryCacheConfig {
            max_capacity: 100,
            time_to_live_seconds: ceiling_secs,
        })
    }

    #[tokio::test]
    async fn test_value_is_readable_until_deleted() {
        let cache = provider(60);
        cache.set("rw:presence:Case:R1", "{}", Duration::from_secs(30)).await.unwrap();
        assert_eq!(cache.get("rw:presence:Case:R1").await.unwrap().as_deref(), Some("{}"));
        assert!(cache.exists("rw:presence:Case:R1").await.unwrap());

        cache.delete("rw:presence:Case:R1").await.unwrap();
        assert_eq!(cache.get("rw:presence:Case:R1").await.unwrap(), None);
        assert!(!cache.exists("rw:presence:Case:R1").await.unwrap());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let cache = provider(60);
        cache.set("k", "first", Duration::from_secs(30)).await.unwrap();
        cache.set("k", "second", Duration::from_secs(30)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        assert!(provider(60).delete("never-set").await.is_ok());
    }

    #[tokio::test]
    async fn test_ttl_is_capped_by_ceiling() {
        let cache = provider(1);
        cache.set("short", "v", Duration::from_secs(3600)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1_200)).await;
        assert_eq!(cache.get("short").await.unwrap(), None);
    }
}
