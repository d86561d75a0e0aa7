use reqwest::StatusCode;

use weather_notify::domain::WeatherReading;

use crate::helpers::{kyiv_weather, TestApp};

#[tokio::test]
async fn weather_returns_reading_as_json() {
    let app = TestApp::spawn().await;

    let res = app
        .weather(Some("Kyiv"))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    let body: serde_json::Value = res.json().await.expect("Failed to parse body");
    assert_eq!(4.5, body["temperature"]);
    assert_eq!(87.0, body["humidity"]);
    assert_eq!("Mist", body["description"]);

    let reading: WeatherReading = serde_json::from_value(body).unwrap();
    assert_eq!(kyiv_weather(), reading);
}

#[tokio::test]
async fn weather_without_city_is_a_bad_request() {
    let app = TestApp::spawn().await;

    for city in [None, Some(""), Some("   ")] {
        let res = app.weather(city).await.expect("Failed to execute request");

        assert_eq!(StatusCode::BAD_REQUEST, res.status(), "city was {:?}", city);
    }
}

#[tokio::test]
async fn weather_for_unknown_city_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .weather(Some("Atlantis"))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::NOT_FOUND, res.status());
    assert_eq!("City not found", res.text().await.unwrap());
}

#[tokio::test]
async fn weather_upstream_failure_is_a_bad_request() {
    let app = TestApp::spawn().await;

    let res = app
        .weather(Some("Broken"))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}
