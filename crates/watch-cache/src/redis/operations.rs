//! [`CacheProvider`] over Redis string keys with `EX` expiry.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use watch_core::error::{AppError, ErrorKind};
use watch_core::result::AppResult;
use watch_core::traits::cache::CacheProvider;

use super::client::RedisClient;

#[derive(Debug, Clone)]
pub struct RedisCacheProvider {
    client: RedisClient,
}

impl RedisCacheProvider {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

/// Redis errors after startup are treated as a transient outage.
fn unavailable<'a>(command: &'static str, key: &'a str) -> impl FnOnce(redis::RedisError) -> AppError + 'a {
    move |e| {
        AppError::with_source(
            ErrorKind::StoreUnavailable,
            format!("Redis {command} {key} failed"),
            e,
        )
    }
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.client
            .connection()
            .get(key)
            .await
            .map_err(unavailable("GET", key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        // EX 0 is rejected by Redis.
        let seconds = ttl.as_secs().max(1);
        self.client
            .connection()
            .set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(unavailable("SET", key))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .connection()
            .del::<_, ()>(key)
            .await
            .map_err(unavailable("DEL", key))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.client
            .connection()
            .exists(key)
            .await
            .map_err(unavailable("EXISTS", key))
    }

    async fn ping(&self) -> AppResult<bool> {
        let mut conn = self.client.connection();
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable("PING", ""))?;
        Ok(reply == "PONG")
    }
}
