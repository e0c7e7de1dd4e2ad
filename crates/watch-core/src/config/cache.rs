//! Shared presence store backend configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which cache backend holds presence entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local moka cache. Only clients in the same process share it.
    #[default]
    Memory,
    /// Redis, shared by every client pointing at the same server.
    Redis,
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub provider: CacheBackend,
    /// Lifetime of a presence entry after its last write. Bounds how long
    /// marks of crashed clients linger.
    #[serde(default = "default_entry_ttl")]
    pub default_ttl_seconds: u64,
    /// Namespace for every key this process writes.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default)]
    pub redis: RedisCacheConfig,
    #[serde(default)]
    pub memory: MemoryCacheConfig,
}

impl CacheConfig {
    pub fn entry_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            provider: CacheBackend::default(),
            default_ttl_seconds: default_entry_ttl(),
            key_prefix: default_key_prefix(),
            redis: RedisCacheConfig::default(),
            memory: MemoryCacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Entry count at which moka starts evicting.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Ceiling on any entry's lifetime, whatever TTL it was written with.
    #[serde(default = "default_entry_ttl")]
    pub time_to_live_seconds: u64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            time_to_live_seconds: default_entry_ttl(),
        }
    }
}

fn default_entry_ttl() -> u64 {
    8 * 60 * 60
}

fn default_key_prefix() -> String {
    "recordwatch".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_max_capacity() -> u64 {
    10_000
}
