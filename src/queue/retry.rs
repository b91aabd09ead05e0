//! Publish retries and dead-lettering

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    config::RetryConfig,
    error::{AppError, AppResult},
};

use super::SharedBroker;

/// Exponential backoff with 0-25% jitter, capped at `max_ms`.
/// Attempt 0 means no delay.
pub fn calculate_backoff(attempt: u8, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exp_factor = 2u64.saturating_pow(u32::from(attempt - 1));
    let delay_ms = base_ms.saturating_mul(exp_factor);

    let jitter = if delay_ms > 0 {
        rand::rng().random_range(0..=delay_ms / 4)
    } else {
        0
    };

    Duration::from_millis(delay_ms.saturating_add(jitter).min(max_ms))
}

/// Envelope written to the dead-letter queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    /// Queue the message was meant for
    pub queue: String,
    /// Original payload, untouched
    pub payload: String,
    /// Last error observed
    pub error: String,
    pub attempts: u8,
    pub failed_at: DateTime<Utc>,
}

/// How a publish ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Delivered,
    /// Retry budget exhausted; the message was routed to the dead-letter queue
    DeadLettered,
}

/// Publishes with bounded retries and routes undeliverable messages to the
/// dead-letter queue
#[derive(Clone)]
pub struct QueuePublisher {
    broker: SharedBroker,
    dead_letter_queue: String,
    policy: RetryConfig,
}

impl QueuePublisher {
    pub fn new(broker: SharedBroker, dead_letter_queue: impl Into<String>, policy: RetryConfig) -> Self {
        Self {
            broker,
            dead_letter_queue: dead_letter_queue.into(),
            policy,
        }
    }

    pub fn broker(&self) -> &SharedBroker {
        &self.broker
    }

    pub fn policy(&self) -> &RetryConfig {
        &self.policy
    }

    /// Serialize and publish a message
    pub async fn publish<T: Serialize + Sync>(
        &self,
        queue: &str,
        message: &T,
    ) -> AppResult<PublishOutcome> {
        let payload = serde_json::to_string(message)?;
        self.publish_raw(queue, &payload).await
    }

    /// Publish a payload, retrying with backoff. Returns an error only when
    /// the dead-letter publish fails as well.
    pub async fn publish_raw(&self, queue: &str, payload: &str) -> AppResult<PublishOutcome> {
        let mut attempt: u8 = 0;

        loop {
            match self.broker.publish(queue, payload).await {
                Ok(()) => return Ok(PublishOutcome::Delivered),
                Err(e) if attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = calculate_backoff(
                        attempt,
                        self.policy.base_delay_ms,
                        self.policy.max_delay_ms,
                    );
                    tracing::warn!(
                        queue = %queue,
                        attempt,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Publish failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.dead_letter(queue, payload, &e.to_string(), attempt.saturating_add(1))
                        .await?;
                    return Ok(PublishOutcome::DeadLettered);
                }
            }
        }
    }

    /// Route a payload to the dead-letter queue
    pub async fn dead_letter(
        &self,
        queue: &str,
        payload: &str,
        error: &str,
        attempts: u8,
    ) -> AppResult<()> {
        let letter = DeadLetter {
            queue: queue.to_string(),
            payload: payload.to_string(),
            error: error.to_string(),
            attempts,
            failed_at: Utc::now(),
        };

        tracing::error!(
            queue = %queue,
            dead_letter_queue = %self.dead_letter_queue,
            attempts,
            error = %error,
            "Message dead-lettered"
        );

        let body = serde_json::to_string(&letter)?;
        self.broker
            .publish(&self.dead_letter_queue, &body)
            .await
            .map_err(|e| AppError::Queue(format!("dead-letter publish failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{Broker, Delivery, InMemoryBroker};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Fails the first `failures` publishes to `flaky_queue`
    struct FlakyBroker {
        inner: InMemoryBroker,
        flaky_queue: String,
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Broker for FlakyBroker {
        async fn ensure_queue(&self, queue: &str) -> AppResult<()> {
            self.inner.ensure_queue(queue).await
        }

        async fn publish(&self, queue: &str, payload: &str) -> AppResult<()> {
            if queue == self.flaky_queue
                && self.calls.fetch_add(1, Ordering::SeqCst) < self.failures
            {
                return Err(AppError::Redis("connection reset".to_string()));
            }
            self.inner.publish(queue, payload).await
        }

        async fn receive(&self, queue: &str, consumer: &str) -> AppResult<Option<Delivery>> {
            self.inner.receive(queue, consumer).await
        }

        async fn ack(&self, delivery: &Delivery) -> AppResult<()> {
            self.inner.ack(delivery).await
        }
    }

    fn fast_policy(max_retries: u8) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay_ms: 1,
            max_delay_ms: 4,
        }
    }

    fn flaky(failures: usize) -> Arc<FlakyBroker> {
        Arc::new(FlakyBroker {
            inner: InMemoryBroker::new(Duration::from_millis(20)),
            flaky_queue: "judge_queue".to_string(),
            failures,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        assert_eq!(calculate_backoff(0, 100, 5000), Duration::ZERO);

        for _ in 0..50 {
            let first = calculate_backoff(1, 100, 5000).as_millis();
            let third = calculate_backoff(3, 100, 5000).as_millis();
            assert!((100..=125).contains(&first));
            assert!((400..=500).contains(&third));
            assert!(calculate_backoff(20, 100, 5000).as_millis() <= 5000);
        }
    }

    #[tokio::test]
    async fn test_publish_recovers_after_transient_failures() {
        let broker = flaky(2);
        let publisher = QueuePublisher::new(broker.clone(), "dead", fast_policy(3));

        let outcome = publisher.publish_raw("judge_queue", "{}").await.unwrap();

        assert_eq!(outcome, PublishOutcome::Delivered);
        assert_eq!(broker.calls.load(Ordering::SeqCst), 3);
        assert!(broker.receive("dead", "c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_publish_dead_letters_when_budget_exhausted() {
        let broker = flaky(usize::MAX);
        let publisher = QueuePublisher::new(broker.clone(), "dead", fast_policy(2));

        let outcome = publisher.publish_raw("judge_queue", "{\"x\":1}").await.unwrap();

        assert_eq!(outcome, PublishOutcome::DeadLettered);
        assert_eq!(broker.calls.load(Ordering::SeqCst), 3);

        let delivery = broker.receive("dead", "c").await.unwrap().unwrap();
        let letter: DeadLetter = serde_json::from_str(&delivery.payload).unwrap();
        assert_eq!(letter.queue, "judge_queue");
        assert_eq!(letter.payload, "{\"x\":1}");
        assert_eq!(letter.attempts, 3);
    }
}
