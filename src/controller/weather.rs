use actix_web::dev::HttpServiceFactory;
use actix_web::{get, web};

use serde::Deserialize;

use crate::domain::{City, WeatherReading};
use crate::error::{RestError, RestResult};
use crate::weather::WeatherSource;

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    city: Option<String>,
}

/// Current weather for a city
#[tracing::instrument(name = "Get current weather", skip(weather))]
#[get("/weather")]
async fn current(
    weather: web::Data<dyn WeatherSource>,
    query: web::Query<WeatherQuery>,
) -> RestResult<web::Json<WeatherReading>> {
    let city: City = query
        .city
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(RestError::BadRequest)?;

    let reading = weather.get_weather(city.as_ref()).await?;

    Ok(web::Json(reading))
}

pub fn services() -> impl HttpServiceFactory {
    current
}
