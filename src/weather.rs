//! Weather resolution: providers tried in a fixed fallback order, fronted by a
//! cache-aside TTL cache.

mod cache;
mod chain;
mod provider;

pub use cache::{weather_cache_key, WeatherCache, WEATHER_CACHE_TTL};
pub use chain::WeatherFallbackChain;
pub use provider::{Geocoder, WeatherProvider};

use crate::domain::WeatherReading;

/// Failure taxonomy shared by geocoding, providers, the chain and the cache
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeatherError {
    #[error("city not found")]
    CityNotFound,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("upstream error: {0}")]
    Upstream(String),
}

/// Anything that can answer "what is the weather in this city"
#[async_trait::async_trait]
pub trait WeatherSource: Send + Sync {
    async fn get_weather(&self, city: &str) -> Result<WeatherReading, WeatherError>;
}
