use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Mutex;

use super::{BrokerError, Delivery, MessageBroker, ReadPosition};

#[derive(Debug, Default)]
struct QueueState {
    backlog: VecDeque<Delivery>,
    pending: HashMap<String, Vec<Delivery>>,
    acked: Vec<String>,
}

/// Process-local broker with the same delivery contract as the Redis one:
/// a delivered entry stays pending for its consumer until acknowledged.
#[derive(Debug, Default)]
pub struct InMemoryBroker {
    queues: Mutex<HashMap<String, QueueState>>,
    next_id: AtomicU64,
    unavailable: AtomicBool,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Entries published but not yet delivered
    pub async fn queued(&self, queue: &str) -> Vec<Delivery> {
        self.queues
            .lock()
            .await
            .get(queue)
            .map(|state| state.backlog.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Entries delivered to `consumer` and not yet acknowledged
    pub async fn pending(&self, queue: &str, consumer: &str) -> Vec<Delivery> {
        self.queues
            .lock()
            .await
            .get(queue)
            .and_then(|state| state.pending.get(consumer).cloned())
            .unwrap_or_default()
    }

    /// Ids acknowledged so far, in acknowledgement order
    pub async fn acknowledged(&self, queue: &str) -> Vec<String> {
        self.queues
            .lock()
            .await
            .get(queue)
            .map(|state| state.acked.clone())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), BrokerError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BrokerError::Backend("broker is unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MessageBroker for InMemoryBroker {
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        self.check_available()?;
        self.queues.lock().await.entry(queue.into()).or_default();
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        self.check_available()?;
        let mut queues = self.queues.lock().await;
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::UnknownQueue(queue.into()))?;

        let id = format!("{}-0", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        state.backlog.push_back(Delivery {
            id,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn receive(
        &self,
        queue: &str,
        consumer: &str,
        position: ReadPosition,
    ) -> Result<Vec<Delivery>, BrokerError> {
        self.check_available()?;
        let deliveries = {
            let mut queues = self.queues.lock().await;
            let state = queues
                .get_mut(queue)
                .ok_or_else(|| BrokerError::UnknownQueue(queue.into()))?;

            match position {
                ReadPosition::Pending => state.pending.get(consumer).cloned().unwrap_or_default(),
                ReadPosition::New => {
                    let delivered: Vec<Delivery> = state.backlog.drain(..).collect();
                    state
                        .pending
                        .entry(consumer.into())
                        .or_default()
                        .extend(delivered.iter().cloned());
                    delivered
                }
            }
        };

        if deliveries.is_empty() {
            // Stand-in for a blocking read so idle consumers do not spin
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        Ok(deliveries)
    }

    async fn ack(&self, queue: &str, delivery_id: &str) -> Result<(), BrokerError> {
        self.check_available()?;
        let mut queues = self.queues.lock().await;
        let state = queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::UnknownQueue(queue.into()))?;

        for pending in state.pending.values_mut() {
            pending.retain(|delivery| delivery.id != delivery_id);
        }
        state.acked.push(delivery_id.into());
        Ok(())
    }
}
