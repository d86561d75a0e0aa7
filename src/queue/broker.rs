use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("queue {0:?} has not been declared")]
    UnknownQueue(String),

    #[error("broker unavailable: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for BrokerError {
    fn from(e: redis::RedisError) -> Self {
        Self::Backend(e.to_string())
    }
}

/// A message handed to a consumer, held by the broker until acknowledged
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub id: String,
    pub payload: Vec<u8>,
}

/// Which entries a consumer reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPosition {
    /// Entries already delivered to this consumer but never acknowledged
    Pending,
    /// Entries never delivered to any consumer
    New,
}

/// Durable queue transport with manual acknowledgement
#[async_trait::async_trait]
pub trait MessageBroker: Send + Sync {
    /// Create the queue if needed; declaring an existing queue is a no-op
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError>;

    /// Returns once the broker has accepted the payload
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError>;

    /// Pull a batch of deliveries for `consumer`; may be empty
    async fn receive(
        &self,
        queue: &str,
        consumer: &str,
        position: ReadPosition,
    ) -> Result<Vec<Delivery>, BrokerError>;

    async fn ack(&self, queue: &str, delivery_id: &str) -> Result<(), BrokerError>;
}
