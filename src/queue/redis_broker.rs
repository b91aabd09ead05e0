//! Redis Streams broker
//!
//! Each queue is a stream read through one consumer group. Payloads are
//! stored in a single `payload` field. Un-acknowledged deliveries stay in the
//! group's pending list; a consumer re-reads its own pending entries once,
//! oldest first, before taking new ones, so a crash between delivery and ack
//! causes redelivery. An entry still un-acked after its replay is left alone
//! until the next restart.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::{
    aio::{ConnectionManager, MultiplexedConnection},
    streams::{StreamReadOptions, StreamReadReply},
    AsyncCommands, RedisError,
};
use tokio::sync::Mutex;

use crate::{config::QueueConfig, error::AppResult};

use super::{Broker, Delivery};

/// Field holding the JSON payload of a stream entry
const PAYLOAD_FIELD: &str = "payload";

/// Progress through a consumer's pending list
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingReplay {
    /// Next replay returns pending entries with an id greater than this one
    From(String),
    Drained,
}

impl PendingReplay {
    fn start() -> Self {
        Self::From("0".to_string())
    }

    /// Move past an entry that was just replayed
    fn advance(&mut self, delivered_id: &str) {
        *self = Self::From(delivered_id.to_string());
    }
}

/// Per-consumer connection state
struct ConsumerConnection {
    conn: MultiplexedConnection,
    pending: PendingReplay,
}

/// Broker backed by Redis Streams and consumer groups
pub struct RedisStreamBroker {
    client: redis::Client,
    /// Shared connection for publish/ack/group management
    commands: ConnectionManager,
    group: String,
    block_ms: u64,
    /// Blocking reads stall a connection, so every consumer gets its own
    consumers: Mutex<HashMap<String, ConsumerConnection>>,
}

impl RedisStreamBroker {
    /// Connect to Redis
    pub async fn connect(config: &QueueConfig) -> AppResult<Self> {
        tracing::info!("Connecting to Redis...");
        let client = redis::Client::open(config.redis_url.as_str())?;
        let commands = ConnectionManager::new(client.clone()).await?;

        Ok(Self {
            client,
            commands,
            group: config.consumer_group.clone(),
            block_ms: config.block_ms,
            consumers: Mutex::new(HashMap::new()),
        })
    }

    async fn read(
        &self,
        conn: &mut MultiplexedConnection,
        queue: &str,
        consumer: &str,
        from_id: &str,
    ) -> Result<Option<Delivery>, RedisError> {
        let options = StreamReadOptions::default()
            .group(&self.group, consumer)
            .count(1)
            .block(self.block_ms as usize);

        let reply: Option<StreamReadReply> =
            conn.xread_options(&[queue], &[from_id], &options).await?;

        let entry = reply
            .and_then(|reply| reply.keys.into_iter().next())
            .and_then(|key| key.ids.into_iter().next());

        Ok(entry.map(|entry| Delivery {
            queue: queue.to_string(),
            payload: entry.get::<String>(PAYLOAD_FIELD).unwrap_or_default(),
            id: entry.id,
        }))
    }
}

fn is_missing_group(err: &RedisError) -> bool {
    err.code() == Some("NOGROUP")
}

#[async_trait]
impl Broker for RedisStreamBroker {
    async fn ensure_queue(&self, queue: &str) -> AppResult<()> {
        let mut conn = self.commands.clone();

        // Start from 0 so entries published before the group existed are consumed
        let result: Result<(), RedisError> =
            conn.xgroup_create_mkstream(queue, &self.group, "0").await;

        match result {
            Ok(()) => {
                tracing::info!(queue = %queue, group = %self.group, "Created consumer group");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => {
                tracing::debug!(queue = %queue, "Consumer group already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn publish(&self, queue: &str, payload: &str) -> AppResult<()> {
        let mut conn = self.commands.clone();
        let id: String = conn.xadd(queue, "*", &[(PAYLOAD_FIELD, payload)]).await?;
        tracing::debug!(queue = %queue, message_id = %id, "Published message");
        Ok(())
    }

    async fn receive(&self, queue: &str, consumer: &str) -> AppResult<Option<Delivery>> {
        let mut consumers = self.consumers.lock().await;
        if !consumers.contains_key(consumer) {
            let conn = self.client.get_multiplexed_async_connection().await?;
            consumers.insert(
                consumer.to_string(),
                ConsumerConnection {
                    conn,
                    pending: PendingReplay::start(),
                },
            );
        }
        let Some(state) = consumers.get_mut(consumer) else {
            return Ok(None);
        };
        let mut conn = state.conn.clone();
        let pending = state.pending.clone();
        drop(consumers);

        if let PendingReplay::From(after) = pending {
            match self.read(&mut conn, queue, consumer, &after).await {
                Ok(Some(delivery)) => {
                    tracing::info!(
                        queue = %queue,
                        message_id = %delivery.id,
                        "Replaying pending message"
                    );
                    if let Some(state) = self.consumers.lock().await.get_mut(consumer) {
                        state.pending.advance(&delivery.id);
                    }
                    return Ok(Some(delivery));
                }
                Ok(None) => {
                    if let Some(state) = self.consumers.lock().await.get_mut(consumer) {
                        state.pending = PendingReplay::Drained;
                    }
                }
                Err(e) if is_missing_group(&e) => {
                    tracing::warn!(queue = %queue, "Consumer group missing, re-initializing...");
                    self.ensure_queue(queue).await?;
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }

        match self.read(&mut conn, queue, consumer, ">").await {
            Ok(delivery) => Ok(delivery),
            Err(e) if is_missing_group(&e) => {
                tracing::warn!(queue = %queue, "Consumer group missing, re-initializing...");
                self.ensure_queue(queue).await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ack(&self, delivery: &Delivery) -> AppResult<()> {
        let mut conn = self.commands.clone();
        let _: i64 = conn
            .xack(&delivery.queue, &self.group, &[&delivery.id])
            .await?;
        Ok(())
    }
}
