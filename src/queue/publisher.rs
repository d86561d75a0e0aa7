use std::sync::Arc;

use thiserror::Error;

use super::{BrokerError, JobQueues, MessageBroker, NotificationJob};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode job")]
    Encode(#[source] serde_json::Error),

    #[error("failed to hand job to the broker")]
    Broker(#[source] BrokerError),
}

/// Serializes jobs and hands them to the broker.
///
/// Safe to share between concurrent callers; the broker owns any connection
/// multiplexing.
#[derive(Clone)]
pub struct NotificationPublisher {
    broker: Arc<dyn MessageBroker>,
    queues: JobQueues,
}

impl NotificationPublisher {
    pub fn new(broker: Arc<dyn MessageBroker>, queues: JobQueues) -> Self {
        Self { broker, queues }
    }

    #[tracing::instrument(
        name = "Publish notification job",
        skip(self, job),
        fields(job = job.kind(), subscription.id = %job.subscription().id)
    )]
    pub async fn publish(&self, queue: &str, job: &NotificationJob) -> Result<(), PublishError> {
        let payload = job.encode().map_err(PublishError::Encode)?;
        self.broker
            .publish(queue, &payload)
            .await
            .map_err(PublishError::Broker)
    }

    /// Publish to the queue the job type is routed to
    pub async fn enqueue(&self, job: &NotificationJob) -> Result<(), PublishError> {
        self.publish(job.queue(&self.queues), job).await
    }
}
