use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Timelike, Utc};

use tokio::task::JoinHandle;

use crate::domain::Frequency;
use crate::service::SubscriptionService;

/// Next broadcast strictly after `now`: the top of the next hour for hourly
/// subscriptions, `daily_hour:00` UTC for daily ones.
pub fn next_run(frequency: Frequency, now: DateTime<Utc>, daily_hour: u32) -> DateTime<Utc> {
    let midnight = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::default()));

    match frequency {
        Frequency::Hourly => midnight + Duration::hours(i64::from(now.hour()) + 1),
        Frequency::Daily => {
            let today = midnight + Duration::hours(i64::from(daily_hour % 24));
            if today > now {
                today
            } else {
                today + Duration::days(1)
            }
        }
    }
}

/// Periodically triggers weather broadcasts, one task per frequency
pub struct BroadcastScheduler {
    service: Arc<SubscriptionService>,
    daily_hour: u32,
}

impl BroadcastScheduler {
    pub fn new(service: Arc<SubscriptionService>, daily_hour: u32) -> Self {
        Self {
            service,
            daily_hour,
        }
    }

    /// Start the broadcast loops; they run until the runtime shuts down
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        Frequency::ALL
            .into_iter()
            .map(|frequency| {
                let service = self.service.clone();
                let daily_hour = self.daily_hour;
                tokio::spawn(run(service, frequency, daily_hour))
            })
            .collect()
    }
}

async fn run(service: Arc<SubscriptionService>, frequency: Frequency, daily_hour: u32) {
    loop {
        let now = Utc::now();
        let next = next_run(frequency, now, daily_hour);
        tracing::info!(%frequency, next_run = %next, "Next weather broadcast scheduled");

        tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;

        if let Err(error) = service.broadcast(frequency).await {
            tracing::error!(%frequency, error.cause_chain = ?error, "Weather broadcast failed");
        }
    }
}
