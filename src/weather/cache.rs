use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheError, CacheStore};
use crate::domain::WeatherReading;

use super::{WeatherError, WeatherSource};

pub const WEATHER_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Cache key for a city, case-sensitive as supplied
pub fn weather_cache_key(city: &str) -> String {
    format!("weather:{}", city)
}

/// Cache-aside wrapper in front of another weather source.
///
/// A cached reading is returned without touching the wrapped source. Cache
/// failures are logged and never reported to the caller.
pub struct WeatherCache {
    store: Arc<dyn CacheStore>,
    source: Arc<dyn WeatherSource>,
    ttl: Duration,
}

impl WeatherCache {
    pub fn new(store: Arc<dyn CacheStore>, source: Arc<dyn WeatherSource>) -> Self {
        Self {
            store,
            source,
            ttl: WEATHER_CACHE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    async fn cached(&self, key: &str) -> Result<WeatherReading, CacheError> {
        let raw = self.store.get(key).await?.ok_or(CacheError::Miss)?;
        serde_json::from_str(&raw).map_err(|e| CacheError::Decode(e.to_string()))
    }

    async fn remember(&self, key: &str, reading: &WeatherReading) -> Result<(), CacheError> {
        let raw = serde_json::to_string(reading).map_err(|e| CacheError::Encode(e.to_string()))?;
        self.store.set_with_ttl(key, raw, self.ttl).await
    }
}

#[async_trait::async_trait]
impl WeatherSource for WeatherCache {
    #[tracing::instrument(name = "Get weather", skip(self))]
    async fn get_weather(&self, city: &str) -> Result<WeatherReading, WeatherError> {
        let key = weather_cache_key(city);

        match self.cached(&key).await {
            Ok(reading) => {
                tracing::debug!(city, "Weather served from cache");
                return Ok(reading);
            }
            Err(CacheError::Miss) => tracing::debug!(city, "Weather cache miss"),
            Err(error) => tracing::warn!(city, %error, "Failed to read weather cache"),
        }

        let reading = self.source.get_weather(city).await?;

        if let Err(error) = self.remember(&key, &reading).await {
            tracing::warn!(city, %error, "Failed to write weather cache");
        }

        Ok(reading)
    }
}
