use serde::{Deserialize, Serialize};

/// Current weather for a city, either fetched from a provider or read back
/// from the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temperature: f64,
    pub humidity: f64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
}
