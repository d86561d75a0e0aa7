use std::sync::Arc;

use reqwest::Client;

use secrecy::{ExposeSecret, Secret};

use serde::Deserialize;

use url::Url;

use crate::domain::{Coordinates, WeatherReading};
use crate::weather::{Geocoder, WeatherError, WeatherProvider};

use super::{endpoint, transport_error};

/// OpenWeatherMap direct geocoding client
pub struct OpenWeatherGeocoder {
    client: Client,
    base_url: Url,
    api_key: Secret<String>,
}

impl OpenWeatherGeocoder {
    pub fn new(client: Client, base_url: Url, api_key: Secret<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl Geocoder for OpenWeatherGeocoder {
    #[tracing::instrument(name = "Resolve city coordinates", skip(self))]
    async fn resolve(&self, city: &str) -> Result<Coordinates, WeatherError> {
        let mut url = endpoint(&self.base_url, "geo/1.0/direct")?;
        url.query_pairs_mut()
            .append_pair("q", city)
            .append_pair("limit", "1")
            .append_pair("appid", self.api_key.expose_secret());

        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        if !res.status().is_success() {
            return Err(WeatherError::Upstream(format!(
                "geocoding responded with {}",
                res.status()
            )));
        }

        let matches: Vec<Coordinates> = res.json().await.map_err(transport_error)?;
        matches.into_iter().next().ok_or(WeatherError::CityNotFound)
    }
}

/// openweathermap.org client, queried by coordinates
pub struct OpenWeatherProvider {
    client: Client,
    base_url: Url,
    api_key: Secret<String>,
    geocoder: Arc<dyn Geocoder>,
}

impl OpenWeatherProvider {
    pub fn new(
        client: Client,
        base_url: Url,
        api_key: Secret<String>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            geocoder,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    main: Main,
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[async_trait::async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn name(&self) -> &str {
        "openweathermap.org"
    }

    #[tracing::instrument(name = "Fetch weather from openweathermap.org", skip(self))]
    async fn fetch_weather(&self, city: &str) -> Result<WeatherReading, WeatherError> {
        let coordinates = self.geocoder.resolve(city).await?;

        let mut url = endpoint(&self.base_url, "data/2.5/weather")?;
        url.query_pairs_mut()
            .append_pair("lat", &coordinates.latitude.to_string())
            .append_pair("lon", &coordinates.longitude.to_string())
            .append_pair("appid", self.api_key.expose_secret())
            .append_pair("units", "metric");

        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        if !res.status().is_success() {
            return Err(WeatherError::Upstream(format!(
                "openweathermap.org responded with {}",
                res.status()
            )));
        }

        let WeatherResponse { main, weather } = res.json().await.map_err(transport_error)?;
        let condition = weather
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::Upstream("no weather conditions returned".into()))?;

        Ok(WeatherReading {
            temperature: main.temp,
            humidity: main.humidity,
            description: condition.description,
        })
    }
}
