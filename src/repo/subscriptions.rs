use uuid::Uuid;

use sqlx::{FromRow, PgPool};

use crate::domain::{Frequency, Subscription};

/// Persistence port for subscription records
#[async_trait::async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn create(&self, subscription: &Subscription) -> sqlx::Result<()>;

    async fn update(&self, subscription: &Subscription) -> sqlx::Result<()>;

    async fn delete(&self, id: Uuid) -> sqlx::Result<()>;

    async fn find_by_token(&self, token: &str) -> sqlx::Result<Option<Subscription>>;

    async fn find_by_email(&self, email: &str) -> sqlx::Result<Option<Subscription>>;

    /// Confirmed subscriptions with the given frequency
    async fn find_by_frequency_and_confirmation(
        &self,
        frequency: Frequency,
    ) -> sqlx::Result<Vec<Subscription>>;
}

/// Whether the error is a unique constraint violation
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Postgres backed subscription repository
#[derive(Debug, Clone)]
pub struct PgSubscriptionRepo {
    pool: PgPool,
}

impl PgSubscriptionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    id: Uuid,
    email: String,
    city: String,
    frequency: String,
    token: String,
    confirmed: bool,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = sqlx::Error;

    fn try_from(row: SubscriptionRow) -> sqlx::Result<Self> {
        let frequency = row
            .frequency
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;

        Ok(Self {
            id: row.id,
            email: row.email,
            city: row.city,
            frequency,
            token: row.token,
            confirmed: row.confirmed,
        })
    }
}

const COLUMNS: &str = "id, email, city, frequency, token, confirmed";

#[async_trait::async_trait]
impl SubscriptionRepo for PgSubscriptionRepo {
    #[tracing::instrument(name = "Insert subscription", skip(self, subscription), fields(subscription.id = %subscription.id))]
    async fn create(&self, subscription: &Subscription) -> sqlx::Result<()> {
        sqlx::query(
            "insert into subscriptions(id, email, city, frequency, token, confirmed) \
             values ($1, $2, $3, $4, $5, $6)",
        )
        .bind(subscription.id)
        .bind(&subscription.email)
        .bind(&subscription.city)
        .bind(subscription.frequency.as_ref())
        .bind(&subscription.token)
        .bind(subscription.confirmed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(name = "Update subscription", skip(self, subscription), fields(subscription.id = %subscription.id))]
    async fn update(&self, subscription: &Subscription) -> sqlx::Result<()> {
        let result = sqlx::query(
            "update subscriptions set email=$2, city=$3, frequency=$4, token=$5, confirmed=$6 \
             where id=$1",
        )
        .bind(subscription.id)
        .bind(&subscription.email)
        .bind(&subscription.city)
        .bind(subscription.frequency.as_ref())
        .bind(&subscription.token)
        .bind(subscription.confirmed)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }

    #[tracing::instrument(name = "Delete subscription", skip(self))]
    async fn delete(&self, id: Uuid) -> sqlx::Result<()> {
        sqlx::query("delete from subscriptions where id=$1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(name = "Find subscription by token", skip_all)]
    async fn find_by_token(&self, token: &str) -> sqlx::Result<Option<Subscription>> {
        sqlx::query_as::<_, SubscriptionRow>(&format!(
            "select {} from subscriptions where token=$1",
            COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .map(Subscription::try_from)
        .transpose()
    }

    #[tracing::instrument(name = "Find subscription by email", skip(self))]
    async fn find_by_email(&self, email: &str) -> sqlx::Result<Option<Subscription>> {
        sqlx::query_as::<_, SubscriptionRow>(&format!(
            "select {} from subscriptions where email=$1",
            COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(Subscription::try_from)
        .transpose()
    }

    #[tracing::instrument(name = "Fetch confirmed subscriptions by frequency", skip(self))]
    async fn find_by_frequency_and_confirmation(
        &self,
        frequency: Frequency,
    ) -> sqlx::Result<Vec<Subscription>> {
        sqlx::query_as::<_, SubscriptionRow>(&format!(
            "select {} from subscriptions where frequency=$1 and confirmed order by created_at",
            COLUMNS
        ))
        .bind(frequency.as_ref())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Subscription::try_from)
        .collect()
    }
}
