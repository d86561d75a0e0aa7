use actix_web::http::StatusCode;
use actix_web::ResponseError;

use thiserror::Error;

use crate::service::SubscriptionError;
use crate::weather::WeatherError;

pub type RestResult<T> = Result<T, RestError>;

/// Errors as reported to HTTP clients, rendered as plain text
#[derive(Debug, Error)]
pub enum RestError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal Server Error")]
    InternalError,
}

impl From<WeatherError> for RestError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::CityNotFound => Self::NotFound("City not found".into()),
            WeatherError::InvalidRequest(msg) => {
                tracing::warn!(error = %msg, "Weather provider rejected request");
                Self::BadRequest("Invalid weather request".into())
            }
            WeatherError::Upstream(msg) => {
                tracing::warn!(error = %msg, "Weather providers unavailable");
                Self::BadRequest("Failed to fetch weather".into())
            }
        }
    }
}

impl From<SubscriptionError> for RestError {
    fn from(e: SubscriptionError) -> Self {
        use SubscriptionError as E;
        match e {
            E::Validation(msg) => Self::BadRequest(msg),
            E::CityNotFound => Self::NotFound("City not found".into()),
            E::TokenNotFound => Self::NotFound("Token not found".into()),
            E::Conflict => Self::Conflict("Email already subscribed".into()),
            E::Weather(e) => e.into(),
            e @ (E::Persistence(_) | E::Signing(_)) => {
                tracing::error!(error.cause_chain = ?e, "Subscription request failed");
                Self::InternalError
            }
        }
    }
}

impl ResponseError for RestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
