mod email_client;
mod open_weather;
mod weather_api;

use std::time::Duration;

use reqwest::Client;

use url::Url;

pub use email_client::{Email, EmailClient};
pub use open_weather::{OpenWeatherGeocoder, OpenWeatherProvider};
pub use weather_api::WeatherApiProvider;

use crate::weather::WeatherError;

/// Shared HTTP client for the weather providers, every request bounded by `timeout`
pub fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(client)
}

/// Append `path` to the path of `base`, keeping any prefix `base` already has
fn endpoint(base: &Url, path: &str) -> Result<Url, WeatherError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| WeatherError::Upstream(format!("{} cannot be used as a base URL", base)))?
        .pop_if_empty()
        .extend(path.split('/'));
    Ok(url)
}

/// Transport failures without the request URL, which carries API keys
fn transport_error(e: reqwest::Error) -> WeatherError {
    WeatherError::Upstream(e.without_url().to_string())
}
