use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::StreamExt;

use thiserror::Error;

use uuid::Uuid;

use crate::crypto::{SigningKey, SubscriptionClaims, TokenError};
use crate::domain::{Frequency, NewSubscription, Subscription};
use crate::queue::{NotificationJob, NotificationPublisher};
use crate::repo::{is_unique_violation, SubscriptionRepo};
use crate::weather::{WeatherError, WeatherSource};

const DEFAULT_BROADCAST_CONCURRENCY: usize = 8;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("{0}")]
    Validation(String),

    #[error("City not found")]
    CityNotFound,

    #[error("Token not found")]
    TokenNotFound,

    #[error("Email already subscribed")]
    Conflict,

    #[error(transparent)]
    Weather(WeatherError),

    #[error("Failed to access subscriptions")]
    Persistence(#[source] sqlx::Error),

    #[error("Failed to sign subscription token")]
    Signing(#[source] TokenError),
}

impl From<WeatherError> for SubscriptionError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::CityNotFound => Self::CityNotFound,
            other => Self::Weather(other),
        }
    }
}

/// Outcome of one broadcast run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastSummary {
    pub total: usize,
    pub published: usize,
    pub skipped: usize,
}

/// Subscription lifecycle: `unconfirmed -> confirmed -> deleted`.
///
/// Every state change is persisted first and announced second. A failed
/// publish is logged and never undoes the persisted change.
pub struct SubscriptionService {
    weather: Arc<dyn WeatherSource>,
    repo: Arc<dyn SubscriptionRepo>,
    publisher: NotificationPublisher,
    signing_key: SigningKey,
    broadcast_concurrency: usize,
}

impl SubscriptionService {
    pub fn new(
        weather: Arc<dyn WeatherSource>,
        repo: Arc<dyn SubscriptionRepo>,
        publisher: NotificationPublisher,
        signing_key: SigningKey,
    ) -> Self {
        Self {
            weather,
            repo,
            publisher,
            signing_key,
            broadcast_concurrency: DEFAULT_BROADCAST_CONCURRENCY,
        }
    }

    /// Maximum number of weather lookups in flight during a broadcast
    pub fn with_broadcast_concurrency(mut self, concurrency: usize) -> Self {
        self.broadcast_concurrency = concurrency.max(1);
        self
    }

    #[tracing::instrument(name = "Subscribe to weather updates", skip(self))]
    pub async fn subscribe(
        &self,
        email: &str,
        city: &str,
        frequency: &str,
    ) -> Result<Subscription, SubscriptionError> {
        let new_subscription =
            NewSubscription::parse(email, city, frequency).map_err(SubscriptionError::Validation)?;

        // Only checks that the city exists
        self.weather.get_weather(new_subscription.city.as_ref()).await?;

        let existing = self
            .repo
            .find_by_email(new_subscription.email.as_ref())
            .await
            .map_err(SubscriptionError::Persistence)?;
        if existing.is_some() {
            return Err(SubscriptionError::Conflict);
        }

        let id = Uuid::new_v4();
        let token = SubscriptionClaims::from(id)
            .sign(&self.signing_key)
            .map_err(SubscriptionError::Signing)?;

        let subscription = Subscription {
            id,
            email: new_subscription.email.to_string(),
            city: new_subscription.city.to_string(),
            frequency: new_subscription.frequency,
            token: token.into(),
            confirmed: false,
        };

        self.repo.create(&subscription).await.map_err(|e| {
            if is_unique_violation(&e) {
                SubscriptionError::Conflict
            } else {
                SubscriptionError::Persistence(e)
            }
        })?;
        tracing::info!(subscription.id = %id, "Subscription created");

        self.notify(NotificationJob::ConfirmationEmail {
            subscription: subscription.clone(),
        })
        .await;

        Ok(subscription)
    }

    /// Confirm a subscription; confirming twice is a no-op
    #[tracing::instrument(name = "Confirm subscription", skip_all)]
    pub async fn confirm(&self, token: &str) -> Result<Subscription, SubscriptionError> {
        let mut subscription = self.find_by_token(token).await?;
        if subscription.confirmed {
            tracing::info!(subscription.id = %subscription.id, "Subscription already confirmed");
            return Ok(subscription);
        }

        subscription.confirmed = true;
        self.repo
            .update(&subscription)
            .await
            .map_err(SubscriptionError::Persistence)?;
        tracing::info!(subscription.id = %subscription.id, "Subscription confirmed");

        self.notify(NotificationJob::ConfirmSuccessEmail {
            subscription: subscription.clone(),
        })
        .await;

        Ok(subscription)
    }

    /// Delete a subscription; an unknown token is `TokenNotFound`
    #[tracing::instrument(name = "Unsubscribe", skip_all)]
    pub async fn unsubscribe(&self, token: &str) -> Result<(), SubscriptionError> {
        let subscription = self.find_by_token(token).await?;

        self.repo
            .delete(subscription.id)
            .await
            .map_err(SubscriptionError::Persistence)?;
        tracing::info!(subscription.id = %subscription.id, "Subscription deleted");

        Ok(())
    }

    /// Publish a weather update for every confirmed subscription with `frequency`.
    ///
    /// Subscriptions whose weather cannot be resolved, or whose job cannot be
    /// published, are skipped without affecting the rest of the batch.
    #[tracing::instrument(name = "Broadcast weather updates", skip(self))]
    pub async fn broadcast(
        &self,
        frequency: Frequency,
    ) -> Result<BroadcastSummary, SubscriptionError> {
        let subscriptions = self
            .repo
            .find_by_frequency_and_confirmation(frequency)
            .await
            .map_err(SubscriptionError::Persistence)?;
        let total = subscriptions.len();
        let published = AtomicUsize::new(0);

        futures::stream::iter(subscriptions)
            .for_each_concurrent(self.broadcast_concurrency, |subscription| {
                let published = &published;
                async move {
                    if self.publish_update(subscription).await {
                        published.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
            .await;

        let published = published.into_inner();
        let summary = BroadcastSummary {
            total,
            published,
            skipped: total - published,
        };
        tracing::info!(
            total = summary.total,
            published = summary.published,
            skipped = summary.skipped,
            "Broadcast finished"
        );
        Ok(summary)
    }

    async fn publish_update(&self, subscription: Subscription) -> bool {
        let weather = match self.weather.get_weather(&subscription.city).await {
            Ok(weather) => weather,
            Err(error) => {
                tracing::warn!(
                    subscription.id = %subscription.id,
                    city = %subscription.city,
                    %error,
                    "Skipping weather update, weather unavailable"
                );
                return false;
            }
        };

        self.notify(NotificationJob::WeatherUpdateEmail {
            subscription,
            weather,
        })
        .await
    }

    /// Look up a subscription by a signed token.
    ///
    /// Tokens that fail verification never reach the repository.
    async fn find_by_token(&self, token: &str) -> Result<Subscription, SubscriptionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SubscriptionError::Validation("Token cannot be empty".into()));
        }

        let claims = SubscriptionClaims::verify(&self.signing_key, token).map_err(|e| {
            tracing::info!(error = %e, "Rejected subscription token");
            SubscriptionError::TokenNotFound
        })?;

        let subscription = self
            .repo
            .find_by_token(token)
            .await
            .map_err(SubscriptionError::Persistence)?
            .ok_or(SubscriptionError::TokenNotFound)?;

        if Uuid::from(claims) != subscription.id {
            return Err(SubscriptionError::TokenNotFound);
        }
        Ok(subscription)
    }

    /// Best-effort publish, returns whether the broker accepted the job
    async fn notify(&self, job: NotificationJob) -> bool {
        match self.publisher.enqueue(&job).await {
            Ok(()) => true,
            Err(error) => {
                tracing::error!(
                    job = job.kind(),
                    subscription.id = %job.subscription().id,
                    error.cause_chain = ?error,
                    "Failed to publish notification job"
                );
                false
            }
        }
    }
}
