use std::time::Duration;

use redis::aio::ConnectionManager;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache miss")]
    Miss,

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("failed to decode cached value: {0}")]
    Decode(String),

    #[error("failed to encode value for caching: {0}")]
    Encode(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Key-value store with per-entry expiry
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a value, `Ok(None)` when the key is absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

/// Redis-backed cache store
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl CacheStore for RedisCache {
    #[tracing::instrument(name = "Read cache entry", skip(self))]
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    #[tracing::instrument(name = "Write cache entry", skip(self, value))]
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        // Redis rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
