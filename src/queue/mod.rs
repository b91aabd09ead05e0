//! Message queues
//!
//! Two durable queues decouple the pipeline: intake publishes judge requests,
//! the judge stage publishes judge results. Deliveries are acknowledged only
//! after successful processing, giving at-least-once semantics. Messages
//! that exhaust their retry budget land on a dead-letter queue.

pub mod memory_broker;
pub mod messages;
pub mod redis_broker;
pub mod retry;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppResult;

pub use memory_broker::InMemoryBroker;
pub use messages::{JudgeRequest, JudgeResultMessage};
pub use redis_broker::RedisStreamBroker;
pub use retry::{calculate_backoff, DeadLetter, PublishOutcome, QueuePublisher};

/// A message handed to a consumer, acknowledged with [`Broker::ack`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub queue: String,
    /// Broker-assigned message id
    pub id: String,
    /// JSON payload
    pub payload: String,
}

/// Queue transport
#[async_trait]
pub trait Broker: Send + Sync {
    /// Make sure a queue and its consumer group exist
    async fn ensure_queue(&self, queue: &str) -> AppResult<()>;

    /// Append a payload to a queue
    async fn publish(&self, queue: &str, payload: &str) -> AppResult<()>;

    /// Wait a bounded time for the next message addressed to `consumer`
    async fn receive(&self, queue: &str, consumer: &str) -> AppResult<Option<Delivery>>;

    /// Acknowledge a processed message
    async fn ack(&self, delivery: &Delivery) -> AppResult<()>;
}

/// Broker shared between intake and the consumers
pub type SharedBroker = Arc<dyn Broker>;
