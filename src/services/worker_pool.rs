//! Queue consumers
//!
//! Each pipeline stage runs as N identical consumers pulling from the same
//! queue. A consumer processes one message at a time: deserialize, run the
//! handler (retrying transient failures with backoff), dead-letter what
//! cannot be processed, then acknowledge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;

use crate::{
    error::AppResult,
    queue::{calculate_backoff, Delivery, QueuePublisher},
};

/// Pause after a failed receive before polling again
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Processes one kind of queue message
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    type Message: DeserializeOwned + Send + Sync;

    /// Stage name used in logs and consumer names
    fn stage(&self) -> &'static str;

    /// Handle one message. Transient errors are retried, anything else is
    /// dead-lettered.
    async fn handle(&self, message: &Self::Message) -> AppResult<()>;
}

/// A single consumer loop bound to one queue
pub struct Consumer<H: MessageHandler> {
    handler: Arc<H>,
    publisher: QueuePublisher,
    queue: String,
    name: String,
    shutdown: Arc<AtomicBool>,
}

impl<H: MessageHandler> Consumer<H> {
    pub fn new(
        handler: Arc<H>,
        publisher: QueuePublisher,
        queue: impl Into<String>,
        name: impl Into<String>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            handler,
            publisher,
            queue: queue.into(),
            name: name.into(),
            shutdown,
        }
    }

    /// Run until the shutdown flag is raised. The in-flight message, if
    /// any, is finished first.
    pub async fn run(self) {
        tracing::info!(
            consumer = %self.name,
            queue = %self.queue,
            stage = self.handler.stage(),
            "Starting consumer"
        );

        if let Err(e) = self.publisher.broker().ensure_queue(&self.queue).await {
            tracing::error!(queue = %self.queue, error = %e, "Failed to initialize queue");
        }

        while !self.shutdown.load(Ordering::SeqCst) {
            match self
                .publisher
                .broker()
                .receive(&self.queue, &self.name)
                .await
            {
                Ok(Some(delivery)) => self.process(delivery).await,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(consumer = %self.name, error = %e, "Error receiving message");
                    tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                }
            }
        }

        tracing::info!(consumer = %self.name, "Consumer shutting down");
    }

    /// Handle one delivery end to end
    pub async fn process(&self, delivery: Delivery) {
        let message = match serde_json::from_str::<H::Message>(&delivery.payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(
                    consumer = %self.name,
                    message_id = %delivery.id,
                    error = %e,
                    "Malformed message"
                );
                let reason = format!("deserialization failed: {}", e);
                if self.dead_letter(&delivery, &reason, 1).await {
                    self.ack(&delivery).await;
                }
                return;
            }
        };

        let policy = *self.publisher.policy();
        let mut attempt: u8 = 0;

        loop {
            match self.handler.handle(&message).await {
                Ok(()) => break,
                Err(e) if e.is_transient() && attempt < policy.max_retries => {
                    attempt += 1;
                    let delay = calculate_backoff(attempt, policy.base_delay_ms, policy.max_delay_ms);
                    tracing::warn!(
                        consumer = %self.name,
                        message_id = %delivery.id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Handler failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        consumer = %self.name,
                        message_id = %delivery.id,
                        error = %e,
                        "Handler failed permanently"
                    );
                    if !self
                        .dead_letter(&delivery, &e.to_string(), attempt.saturating_add(1))
                        .await
                    {
                        return;
                    }
                    break;
                }
            }
        }

        self.ack(&delivery).await;
    }

    /// Returns false when the message could not be parked and must stay
    /// unacknowledged
    async fn dead_letter(&self, delivery: &Delivery, reason: &str, attempts: u8) -> bool {
        match self
            .publisher
            .dead_letter(&self.queue, &delivery.payload, reason, attempts)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    consumer = %self.name,
                    message_id = %delivery.id,
                    error = %e,
                    "Dead-letter failed, leaving message unacknowledged"
                );
                false
            }
        }
    }

    async fn ack(&self, delivery: &Delivery) {
        if let Err(e) = self.publisher.broker().ack(delivery).await {
            tracing::error!(
                consumer = %self.name,
                message_id = %delivery.id,
                error = %e,
                "Failed to acknowledge message"
            );
        }
    }
}

/// Background consumers sharing one shutdown flag
pub struct WorkerPool {
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerPool {
    pub fn new() -> Self {
        Self {
            shutdown: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        }
    }

    /// Spawn `count` consumers of `queue` named `{worker_id}-{stage}-{n}`
    pub fn spawn<H: MessageHandler>(
        &mut self,
        handler: Arc<H>,
        publisher: &QueuePublisher,
        queue: &str,
        count: usize,
        worker_id: &str,
    ) {
        for n in 0..count {
            let name = format!("{}-{}-{}", worker_id, handler.stage(), n);
            let consumer = Consumer::new(
                handler.clone(),
                publisher.clone(),
                queue,
                name,
                self.shutdown.clone(),
            );
            self.handles.push(tokio::spawn(consumer.run()));
        }
    }

    /// Number of running consumers
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Raise the shutdown flag and wait for every consumer to stop
    pub async fn shutdown(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Consumer task failed");
            }
        }
        tracing::info!("All consumers stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::error::AppError;
    use crate::queue::{Broker, DeadLetter, InMemoryBroker};
    use serde::Deserialize;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Deserialize)]
    struct Ping {
        n: u32,
    }

    /// Fails with the given error `failures` times, then succeeds
    struct FlakyHandler {
        failures: usize,
        transient: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MessageHandler for FlakyHandler {
        type Message = Ping;

        fn stage(&self) -> &'static str {
            "test"
        }

        async fn handle(&self, message: &Ping) -> AppResult<()> {
            assert_eq!(message.n, 7);
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                if self.transient {
                    return Err(AppError::Database("connection reset".to_string()));
                }
                return Err(AppError::NotFound("submission".to_string()));
            }
            Ok(())
        }
    }

    fn setup(failures: usize, transient: bool) -> (Arc<InMemoryBroker>, Consumer<FlakyHandler>, Arc<FlakyHandler>) {
        let broker = Arc::new(InMemoryBroker::new(Duration::from_millis(20)));
        let publisher = QueuePublisher::new(
            broker.clone(),
            "dead",
            RetryConfig {
                max_retries: 2,
                base_delay_ms: 1,
                max_delay_ms: 2,
            },
        );
        let handler = Arc::new(FlakyHandler {
            failures,
            transient,
            calls: AtomicUsize::new(0),
        });
        let consumer = Consumer::new(
            handler.clone(),
            publisher,
            "work",
            "test-0",
            Arc::new(AtomicBool::new(false)),
        );
        (broker, consumer, handler)
    }

    fn delivery(payload: &str) -> Delivery {
        Delivery {
            queue: "work".to_string(),
            id: "1".to_string(),
            payload: payload.to_string(),
        }
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let (broker, consumer, handler) = setup(2, true);

        consumer.process(delivery(r#"{"n":7}"#)).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        assert!(broker.receive("dead", "c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exhausted_retries_dead_letter() {
        let (broker, consumer, handler) = setup(usize::MAX, true);

        consumer.process(delivery(r#"{"n":7}"#)).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        let parked = broker.receive("dead", "c").await.unwrap().unwrap();
        let letter: DeadLetter = serde_json::from_str(&parked.payload).unwrap();
        assert_eq!(letter.queue, "work");
        assert_eq!(letter.attempts, 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_dead_letters_without_retry() {
        let (broker, consumer, handler) = setup(1, false);

        consumer.process(delivery(r#"{"n":7}"#)).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert!(broker.receive("dead", "c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_malformed_payload_goes_straight_to_dead_letter() {
        let (broker, consumer, handler) = setup(0, true);

        consumer.process(delivery("not json")).await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        let parked = broker.receive("dead", "c").await.unwrap().unwrap();
        let letter: DeadLetter = serde_json::from_str(&parked.payload).unwrap();
        assert_eq!(letter.payload, "not json");
        assert!(letter.error.starts_with("deserialization failed"));
    }

    #[tokio::test]
    async fn test_pool_drains_queue_and_shuts_down() {
        let broker = Arc::new(InMemoryBroker::new(Duration::from_millis(10)));
        let publisher = QueuePublisher::new(broker.clone(), "dead", RetryConfig::default());
        let handler = Arc::new(FlakyHandler {
            failures: 0,
            transient: true,
            calls: AtomicUsize::new(0),
        });
        for _ in 0..5 {
            broker.publish("work", r#"{"n":7}"#).await.unwrap();
        }

        let mut pool = WorkerPool::new();
        pool.spawn(handler.clone(), &publisher, "work", 2, "w");
        assert_eq!(pool.len(), 2);

        for _ in 0..100 {
            if handler.calls.load(Ordering::SeqCst) == 5 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        pool.shutdown().await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 5);
    }
}
