use reqwest::Client;

use secrecy::{ExposeSecret, Secret};

use serde::Deserialize;

use url::Url;

use crate::domain::WeatherReading;
use crate::weather::{WeatherError, WeatherProvider};

use super::{endpoint, transport_error};

/// WeatherAPI error code for "No matching location found"
const CITY_NOT_FOUND_CODE: i64 = 1006;

/// weatherapi.com client, queried directly by city name
pub struct WeatherApiProvider {
    client: Client,
    base_url: Url,
    api_key: Secret<String>,
}

impl WeatherApiProvider {
    pub fn new(client: Client, base_url: Url, api_key: Secret<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn current_url(&self, city: &str) -> Result<Url, WeatherError> {
        let mut url = endpoint(&self.base_url, "current.json")?;
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret())
            .append_pair("q", city);
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: Current,
}

#[derive(Debug, Deserialize)]
struct Current {
    temp_c: f64,
    humidity: f64,
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct Condition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    message: String,
}

#[async_trait::async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn name(&self) -> &str {
        "weatherapi.com"
    }

    #[tracing::instrument(name = "Fetch weather from weatherapi.com", skip(self))]
    async fn fetch_weather(&self, city: &str) -> Result<WeatherReading, WeatherError> {
        let res = self
            .client
            .get(self.current_url(city)?)
            .send()
            .await
            .map_err(transport_error)?;
        let status = res.status();
        let body = res.bytes().await.map_err(transport_error)?;

        if let Ok(ErrorResponse { error }) = serde_json::from_slice::<ErrorResponse>(&body) {
            tracing::info!(city, code = error.code, message = %error.message, "weatherapi.com rejected request");
            return Err(match error.code {
                CITY_NOT_FOUND_CODE => WeatherError::CityNotFound,
                _ => WeatherError::InvalidRequest(error.message),
            });
        }
        if !status.is_success() {
            return Err(WeatherError::Upstream(format!(
                "weatherapi.com responded with {}",
                status
            )));
        }

        let CurrentResponse { current } = serde_json::from_slice(&body)
            .map_err(|e| WeatherError::Upstream(format!("malformed weatherapi.com body: {}", e)))?;

        Ok(WeatherReading {
            temperature: current.temp_c,
            humidity: current.humidity,
            description: current.condition.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use claims::{assert_err_eq, assert_matches, assert_ok_eq};

    use serde_json::json;

    use wiremock::matchers::*;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn provider(server: &MockServer) -> WeatherApiProvider {
        let client = crate::client::http_client(Duration::from_millis(200)).unwrap();
        let base_url = Url::parse(&server.uri()).unwrap();
        WeatherApiProvider::new(client, base_url, Secret::new("test-key".into()))
    }

    #[tokio::test]
    async fn maps_current_conditions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/current.json"))
            .and(query_param("key", "test-key"))
            .and(query_param("q", "Kyiv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "location": { "name": "Kyiv" },
                "current": {
                    "temp_c": 21.3,
                    "humidity": 48,
                    "condition": { "text": "Partly cloudy" }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert_ok_eq!(
            provider(&server).fetch_weather("Kyiv").await,
            WeatherReading {
                temperature: 21.3,
                humidity: 48.0,
                description: "Partly cloudy".into(),
            }
        );
    }

    #[tokio::test]
    async fn city_is_url_escaped() {
        let server = MockServer::start().await;
        Mock::given(query_param("q", "Rio de Janeiro & co"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "current": { "temp_c": 30.0, "humidity": 70, "condition": { "text": "Sunny" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(provider(&server)
            .fetch_weather("Rio de Janeiro & co")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn error_code_1006_is_city_not_found() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": 1006, "message": "No matching location found." }
            })))
            .mount(&server)
            .await;

        assert_err_eq!(
            provider(&server).fetch_weather("Atlantis").await,
            WeatherError::CityNotFound
        );
    }

    #[tokio::test]
    async fn other_error_codes_are_invalid_requests() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "code": 2006, "message": "API key is invalid." }
            })))
            .mount(&server)
            .await;

        assert_err_eq!(
            provider(&server).fetch_weather("Kyiv").await,
            WeatherError::InvalidRequest("API key is invalid.".into())
        );
    }

    #[tokio::test]
    async fn server_error_without_body_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert_matches!(
            provider(&server).fetch_weather("Kyiv").await,
            Err(WeatherError::Upstream(_))
        );
    }

    #[tokio::test]
    async fn malformed_body_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        assert_matches!(
            provider(&server).fetch_weather("Kyiv").await,
            Err(WeatherError::Upstream(_))
        );
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        match provider(&server).fetch_weather("Kyiv").await {
            Err(WeatherError::Upstream(error)) => assert!(!error.contains("test-key")),
            other => panic!("expected an upstream error, got {:?}", other),
        }
    }
}
