use std::sync::Arc;

use tokio::sync::watch;

use super::{BrokerError, Delivery, JobDecodeError, MessageBroker, NotificationJob, ReadPosition};

/// Work performed for each consumed job
#[async_trait::async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: NotificationJob) -> anyhow::Result<()>;
}

/// Long-lived pull loop over one queue.
///
/// Every delivery is acknowledged once the handler returns, whether it
/// succeeded or not. Payloads that cannot be decoded are acknowledged and
/// dropped. Entries left unacknowledged by a previous run of the same consumer
/// are replayed before any new entries are read.
pub struct NotificationConsumer {
    broker: Arc<dyn MessageBroker>,
    consumer: String,
}

impl NotificationConsumer {
    pub fn new(broker: Arc<dyn MessageBroker>, consumer: impl Into<String>) -> Self {
        Self {
            broker,
            consumer: consumer.into(),
        }
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// Shutdown is only observed between deliveries, an in-flight handler
    /// always runs to completion. Broker failures end the loop with an error.
    #[tracing::instrument(name = "Consume queue", skip(self, handler, shutdown), fields(consumer = %self.consumer))]
    pub async fn consume<H>(
        &self,
        queue: &str,
        handler: &H,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), BrokerError>
    where
        H: JobHandler + ?Sized,
    {
        let mut position = ReadPosition::Pending;

        loop {
            if *shutdown.borrow() {
                tracing::info!("Consumer stopping");
                return Ok(());
            }

            let deliveries = tokio::select! {
                received = self.broker.receive(queue, &self.consumer, position) => received?,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        tracing::info!("Shutdown sender dropped, consumer stopping");
                        return Ok(());
                    }
                    continue;
                }
            };

            if position == ReadPosition::Pending && deliveries.is_empty() {
                tracing::info!("Pending jobs replayed, waiting for new jobs");
                position = ReadPosition::New;
                continue;
            }

            for delivery in deliveries {
                self.process(queue, handler, delivery).await?;
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    #[tracing::instrument(name = "Process delivery", skip(self, handler, delivery), fields(delivery.id = %delivery.id))]
    async fn process<H>(&self, queue: &str, handler: &H, delivery: Delivery) -> Result<(), BrokerError>
    where
        H: JobHandler + ?Sized,
    {
        match NotificationJob::decode(&delivery.payload) {
            Ok(job) => {
                let kind = job.kind();
                match handler.handle(job).await {
                    Ok(()) => tracing::info!(job = kind, "Job handled"),
                    Err(error) => tracing::error!(
                        job = kind,
                        error.cause_chain = ?error,
                        "Job handler failed, dropping job"
                    ),
                }
            }
            Err(JobDecodeError::UnknownType(kind)) => {
                tracing::warn!(kind = %kind, "Dropping job of unknown type")
            }
            Err(error) => tracing::error!(%error, "Dropping undecodable job"),
        }

        self.broker.ack(queue, &delivery.id).await
    }
}
