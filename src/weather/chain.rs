use std::sync::Arc;

use crate::domain::WeatherReading;

use super::{WeatherError, WeatherProvider, WeatherSource};

/// Ordered list of providers, tried one at a time until one succeeds.
///
/// The first provider is the primary, the rest are fallbacks in the order they
/// were added. When every provider fails, the error of the last one is
/// returned.
pub struct WeatherFallbackChain {
    providers: Vec<Arc<dyn WeatherProvider>>,
}

impl WeatherFallbackChain {
    pub fn new(primary: Arc<dyn WeatherProvider>) -> Self {
        Self {
            providers: vec![primary],
        }
    }

    /// Append a provider to try after every provider already in the chain
    pub fn with_fallback(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.providers.push(provider);
        self
    }
}

#[async_trait::async_trait]
impl WeatherSource for WeatherFallbackChain {
    #[tracing::instrument(name = "Fetch weather through provider chain", skip(self))]
    async fn get_weather(&self, city: &str) -> Result<WeatherReading, WeatherError> {
        let mut last_error = None;

        for provider in &self.providers {
            match provider.fetch_weather(city).await {
                Ok(reading) => return Ok(reading),
                Err(error) => {
                    tracing::error!(
                        city,
                        provider = provider.name(),
                        %error,
                        "Weather provider failed, trying next provider"
                    );
                    last_error = Some(error);
                }
            }
        }

        let error = last_error
            .unwrap_or_else(|| WeatherError::Upstream("no weather providers configured".into()));
        tracing::error!(city, %error, "All weather providers failed");
        Err(error)
    }
}
