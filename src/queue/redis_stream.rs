use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::streams::StreamReadReply;
use redis::RedisResult;

use super::{BrokerError, Delivery, MessageBroker, ReadPosition};

const PAYLOAD_FIELD: &str = "payload";

/// Queues on Redis streams, one consumer group shared by every worker.
///
/// Streams are never capped by length. Entries are deleted once acknowledged,
/// so a stream only holds jobs that are undelivered or pending.
///
/// A blocking read holds its connection for up to `block`, so each consumer
/// loop should own its broker.
#[derive(Clone)]
pub struct RedisStreamBroker {
    conn: ConnectionManager,
    group: String,
    batch_size: usize,
    block_ms: u64,
}

impl RedisStreamBroker {
    pub fn new(conn: ConnectionManager, group: impl Into<String>) -> Self {
        Self {
            conn,
            group: group.into(),
            batch_size: 10,
            block_ms: 5_000,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_block(mut self, block: Duration) -> Self {
        self.block_ms = block_millis(block);
        self
    }
}

fn block_millis(block: Duration) -> u64 {
    u64::try_from(block.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait::async_trait]
impl MessageBroker for RedisStreamBroker {
    #[tracing::instrument(name = "Declare queue", skip(self))]
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        let created: RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(queue)
            .arg(&self.group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match created {
            Ok(()) => Ok(()),
            // Group already exists
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(name = "Append to stream", skip(self, payload))]
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        let id: String = redis::cmd("XADD")
            .arg(queue)
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(payload)
            .query_async(&mut conn)
            .await?;
        tracing::debug!(queue, id = %id, "Job appended");
        Ok(())
    }

    async fn receive(
        &self,
        queue: &str,
        consumer: &str,
        position: ReadPosition,
    ) -> Result<Vec<Delivery>, BrokerError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(&self.group)
            .arg(consumer)
            .arg("COUNT")
            .arg(self.batch_size);
        let start = match position {
            ReadPosition::Pending => "0",
            ReadPosition::New => {
                cmd.arg("BLOCK").arg(self.block_ms);
                ">"
            }
        };
        cmd.arg("STREAMS").arg(queue).arg(start);

        // A blocking read that times out replies with nil
        let reply: Option<StreamReadReply> = cmd.query_async(&mut conn).await?;

        let deliveries = reply
            .into_iter()
            .flat_map(|reply| reply.keys)
            .flat_map(|key| key.ids)
            .map(|entry| Delivery {
                // Pending entries deleted out of band come back without fields
                payload: entry.get::<Vec<u8>>(PAYLOAD_FIELD).unwrap_or_default(),
                id: entry.id,
            })
            .collect();

        Ok(deliveries)
    }

    #[tracing::instrument(name = "Acknowledge stream entry", skip(self))]
    async fn ack(&self, queue: &str, delivery_id: &str) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        let _: (i64, i64) = redis::pipe()
            .atomic()
            .cmd("XACK")
            .arg(queue)
            .arg(&self.group)
            .arg(delivery_id)
            .cmd("XDEL")
            .arg(queue)
            .arg(delivery_id)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use claims::{assert_err, assert_ok};

    use uuid::Uuid;

    use super::*;

    const GROUP: &str = "mailer";
    const CONSUMER: &str = "mailer-1";

    async fn connect() -> ConnectionManager {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let client = redis::Client::open(url).expect("Failed to parse REDIS_URL");
        ConnectionManager::new(client)
            .await
            .expect("Failed to connect to Redis")
    }

    async fn broker() -> RedisStreamBroker {
        RedisStreamBroker::new(connect().await, GROUP).with_block(Duration::from_millis(50))
    }

    fn queue_name() -> String {
        format!("test_queue_{}", Uuid::new_v4().simple())
    }

    async fn stream_len(queue: &str) -> usize {
        let mut conn = connect().await;
        redis::cmd("XLEN")
            .arg(queue)
            .query_async(&mut conn)
            .await
            .expect("Failed to read stream length")
    }

    async fn drop_stream(queue: &str) {
        let mut conn = connect().await;
        let _: () = redis::cmd("DEL")
            .arg(queue)
            .query_async(&mut conn)
            .await
            .expect("Failed to delete stream");
    }

    #[test]
    fn block_time_saturates_instead_of_truncating() {
        assert_eq!(1_500, block_millis(Duration::from_millis(1_500)));
        assert_eq!(u64::MAX, block_millis(Duration::MAX));
    }

    #[tokio::test]
    #[ignore = "requires a Redis server"]
    async fn declaring_a_queue_twice_succeeds() {
        let broker = broker().await;
        let queue = queue_name();

        assert_ok!(broker.declare_queue(&queue).await);
        assert_ok!(broker.declare_queue(&queue).await);

        drop_stream(&queue).await;
    }

    #[tokio::test]
    #[ignore = "requires a Redis server"]
    async fn unacknowledged_entry_is_replayed_until_acked() {
        let broker = broker().await;
        let queue = queue_name();
        broker.declare_queue(&queue).await.unwrap();
        broker.publish(&queue, b"{\"type\":\"job\"}").await.unwrap();

        let delivered =
            assert_ok!(broker.receive(&queue, CONSUMER, ReadPosition::New).await);
        assert_eq!(1, delivered.len());
        assert_eq!(b"{\"type\":\"job\"}".to_vec(), delivered[0].payload);

        // Not acked: a restarted consumer sees the same entry again
        let replayed =
            assert_ok!(broker.receive(&queue, CONSUMER, ReadPosition::Pending).await);
        assert_eq!(delivered, replayed);
        let fresh = assert_ok!(broker.receive(&queue, CONSUMER, ReadPosition::New).await);
        assert!(fresh.is_empty());

        assert_ok!(broker.ack(&queue, &delivered[0].id).await);

        let pending =
            assert_ok!(broker.receive(&queue, CONSUMER, ReadPosition::Pending).await);
        assert!(pending.is_empty());
        assert_eq!(0, stream_len(&queue).await);

        drop_stream(&queue).await;
    }

    #[tokio::test]
    #[ignore = "requires a Redis server"]
    async fn undelivered_entries_are_kept() {
        let broker = broker().await;
        let queue = queue_name();
        broker.declare_queue(&queue).await.unwrap();

        for n in 0..3 {
            broker.publish(&queue, format!("{}", n).as_bytes()).await.unwrap();
        }

        assert_eq!(3, stream_len(&queue).await);
        let delivered =
            assert_ok!(broker.receive(&queue, CONSUMER, ReadPosition::New).await);
        let payloads: Vec<_> = delivered.into_iter().map(|d| d.payload).collect();
        assert_eq!(vec![b"0".to_vec(), b"1".to_vec(), b"2".to_vec()], payloads);

        drop_stream(&queue).await;
    }

    #[tokio::test]
    #[ignore = "requires a Redis server"]
    async fn reading_an_undeclared_queue_fails() {
        let broker = broker().await;

        assert_err!(broker.receive(&queue_name(), CONSUMER, ReadPosition::Pending).await);
    }
}
