use crate::domain::{Coordinates, WeatherReading};

use super::WeatherError;

/// A single upstream weather API.
///
/// Providers never retry; falling back to another provider is the job of
/// [`super::WeatherFallbackChain`].
#[async_trait::async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Short provider identity used in logs
    fn name(&self) -> &str;

    async fn fetch_weather(&self, city: &str) -> Result<WeatherReading, WeatherError>;
}

/// Resolves a city name into coordinates for coordinate-based providers
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, city: &str) -> Result<Coordinates, WeatherError>;
}
