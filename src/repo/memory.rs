use std::collections::HashMap;

use tokio::sync::RwLock;

use uuid::Uuid;

use crate::domain::{Frequency, Subscription};

use super::SubscriptionRepo;

/// Subscription repository held in process memory.
///
/// Enforces the same uniqueness rules as the `subscriptions` table, reporting
/// violations as `sqlx::Error::Protocol`.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionRepo {
    subscriptions: RwLock<HashMap<Uuid, Subscription>>,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record
    pub async fn all(&self) -> Vec<Subscription> {
        self.subscriptions.read().await.values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl SubscriptionRepo for InMemorySubscriptionRepo {
    async fn create(&self, subscription: &Subscription) -> sqlx::Result<()> {
        let mut subscriptions = self.subscriptions.write().await;
        let duplicate = subscriptions.values().any(|existing| {
            existing.id == subscription.id
                || existing.email == subscription.email
                || existing.token == subscription.token
        });
        if duplicate {
            return Err(sqlx::Error::Protocol(
                "duplicate subscription id, email or token".into(),
            ));
        }

        subscriptions.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> sqlx::Result<()> {
        let mut subscriptions = self.subscriptions.write().await;
        let existing = subscriptions
            .get_mut(&subscription.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        *existing = subscription.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> sqlx::Result<()> {
        self.subscriptions.write().await.remove(&id);
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> sqlx::Result<Option<Subscription>> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions.values().find(|s| s.token == token).cloned())
    }

    async fn find_by_email(&self, email: &str) -> sqlx::Result<Option<Subscription>> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions.values().find(|s| s.email == email).cloned())
    }

    async fn find_by_frequency_and_confirmation(
        &self,
        frequency: Frequency,
    ) -> sqlx::Result<Vec<Subscription>> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions
            .values()
            .filter(|s| s.confirmed && s.frequency == frequency)
            .cloned()
            .collect())
    }
}
