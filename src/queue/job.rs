use serde::{Deserialize, Serialize};

use thiserror::Error;

use crate::domain::{Subscription, WeatherReading};

use super::JobQueues;

const CONFIRMATION_EMAIL: &str = "CreateSubscription";
const CONFIRM_SUCCESS_EMAIL: &str = "ConfirmSuccess";
const WEATHER_UPDATE_EMAIL: &str = "WeatherUpdate";

/// Unit of work handed from the API process to the mail worker.
///
/// Encoded as a JSON object with a `type` discriminator next to the payload
/// fields, e.g. `{"type":"ConfirmSuccess","subscription":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotificationJob {
    #[serde(rename = "CreateSubscription")]
    ConfirmationEmail { subscription: Subscription },

    #[serde(rename = "ConfirmSuccess")]
    ConfirmSuccessEmail { subscription: Subscription },

    #[serde(rename = "WeatherUpdate")]
    WeatherUpdateEmail {
        subscription: Subscription,
        weather: WeatherReading,
    },
}

#[derive(Debug, Error)]
pub enum JobDecodeError {
    #[error("malformed job payload: {0}")]
    Malformed(String),

    #[error("unknown job type {0:?}")]
    UnknownType(String),
}

impl NotificationJob {
    /// Wire name of the job variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfirmationEmail { .. } => CONFIRMATION_EMAIL,
            Self::ConfirmSuccessEmail { .. } => CONFIRM_SUCCESS_EMAIL,
            Self::WeatherUpdateEmail { .. } => WEATHER_UPDATE_EMAIL,
        }
    }

    pub fn subscription(&self) -> &Subscription {
        match self {
            Self::ConfirmationEmail { subscription }
            | Self::ConfirmSuccessEmail { subscription }
            | Self::WeatherUpdateEmail { subscription, .. } => subscription,
        }
    }

    /// Queue this job is routed to
    pub fn queue<'q>(&self, queues: &'q JobQueues) -> &'q str {
        match self {
            Self::ConfirmationEmail { .. } | Self::ConfirmSuccessEmail { .. } => &queues.email,
            Self::WeatherUpdateEmail { .. } => &queues.weather_update,
        }
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode a payload, telling an unrecognised type tag apart from a broken payload
    pub fn decode(payload: &[u8]) -> Result<Self, JobDecodeError> {
        let value: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| JobDecodeError::Malformed(e.to_string()))?;

        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| JobDecodeError::Malformed("missing job type".into()))?;
        if ![CONFIRMATION_EMAIL, CONFIRM_SUCCESS_EMAIL, WEATHER_UPDATE_EMAIL].contains(&kind) {
            return Err(JobDecodeError::UnknownType(kind.into()));
        }

        serde_json::from_value(value).map_err(|e| JobDecodeError::Malformed(e.to_string()))
    }
}
