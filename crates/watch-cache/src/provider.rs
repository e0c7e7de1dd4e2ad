//! Backend selection for the shared presence store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use watch_core::config::cache::{CacheBackend, CacheConfig};
use watch_core::error::AppError;
use watch_core::result::AppResult;
use watch_core::traits::cache::CacheProvider;

/// The cache backend picked by [`CacheConfig::provider`], behind one
/// cloneable handle.
#[derive(Debug, Clone)]
pub struct CacheManager {
    backend: Arc<dyn CacheProvider>,
}

impl CacheManager {
    /// Open the configured backend.
    ///
    /// A backend that was compiled out, or that cannot be reached at
    /// startup, is a `CacheCapability` error.
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        info!(backend = %config.provider, "Opening presence cache");
        let backend = open_backend(config).await?;
        Ok(Self { backend })
    }
}

async fn open_backend(config: &CacheConfig) -> AppResult<Arc<dyn CacheProvider>> {
    match config.provider {
        #[cfg(feature = "memory")]
        CacheBackend::Memory => Ok(Arc::new(crate::memory::MemoryCacheProvider::new(&config.memory))),
        #[cfg(feature = "redis-backend")]
        CacheBackend::Redis => {
            let client = crate::redis::RedisClient::connect(&config.redis).await?;
            Ok(Arc::new(crate::redis::RedisCacheProvider::new(client)))
        }
        #[allow(unreachable_patterns)]
        disabled => Err(AppError::cache_capability(format!(
            "cache backend '{disabled}' is not compiled into this build"
        ))),
    }
}

#[async_trait]
impl CacheProvider for CacheManager {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.backend.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.backend.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.backend.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.backend.exists(key).await
    }

    async fn ping(&self) -> AppResult<bool> {
        self.backend.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_is_default() {
        let manager = CacheManager::new(&CacheConfig::default()).await.unwrap();
        assert!(manager.ping().await.unwrap());
    }

    #[cfg(not(feature = "redis-backend"))]
    #[tokio::test]
    async fn test_redis_without_feature_is_capability_error() {
        use watch_core::error::ErrorKind;

        let config = CacheConfig {
            provider: CacheBackend::Redis,
            ..CacheConfig::default()
        };
        let err = CacheManager::new(&config).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::CacheCapability);
    }
}
