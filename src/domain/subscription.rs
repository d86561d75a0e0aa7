use serde::{Deserialize, Serialize};

use uuid::Uuid;

use super::{City, EmailAddress, Frequency};

/// Validated subscription request
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub email: EmailAddress,
    pub city: City,
    pub frequency: Frequency,
}

impl NewSubscription {
    /// Validate raw user input
    pub fn parse(email: &str, city: &str, frequency: &str) -> Result<Self, String> {
        Ok(Self {
            email: email.parse()?,
            city: city.parse()?,
            frequency: frequency.parse()?,
        })
    }
}

/// Stored subscription record.
///
/// Travels by value inside notification jobs, so it is also the snapshot a
/// mail worker renders from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub email: String,
    pub city: String,
    pub frequency: Frequency,
    /// Opaque token used for both confirmation and unsubscribe links
    pub token: String,
    pub confirmed: bool,
}
