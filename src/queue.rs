//! Durable notification pipeline between the API process and the mail worker

mod broker;
mod consumer;
mod job;
mod memory;
mod publisher;
mod redis_stream;

pub use broker::{BrokerError, Delivery, MessageBroker, ReadPosition};
pub use consumer::{JobHandler, NotificationConsumer};
pub use job::{JobDecodeError, NotificationJob};
pub use memory::InMemoryBroker;
pub use publisher::{NotificationPublisher, PublishError};
pub use redis_stream::RedisStreamBroker;

/// Names of the two logical queues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQueues {
    /// Confirmation and confirm-success emails
    pub email: String,
    /// Periodic weather update emails
    pub weather_update: String,
}

impl JobQueues {
    pub fn all(&self) -> [&str; 2] {
        [&self.email, &self.weather_update]
    }
}

impl Default for JobQueues {
    fn default() -> Self {
        Self {
            email: "send_email".into(),
            weather_update: "weather_update".into(),
        }
    }
}
