//! In-process broker
//!
//! Queues are unbounded tokio channels. Nothing survives a restart and
//! acknowledgement is a no-op, so this backend suits single-process
//! deployments and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::error::{AppError, AppResult};

use super::{Broker, Delivery};

struct Channel {
    tx: mpsc::UnboundedSender<String>,
    rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<String>>>,
}

impl Channel {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(AsyncMutex::new(rx)),
        }
    }
}

/// Channel-backed broker
pub struct InMemoryBroker {
    channels: Mutex<HashMap<String, Channel>>,
    block: Duration,
    next_id: AtomicU64,
}

impl InMemoryBroker {
    /// `block` bounds how long `receive` waits on an empty queue
    pub fn new(block: Duration) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            block,
            next_id: AtomicU64::new(1),
        }
    }

    fn sender(&self, queue: &str) -> AppResult<mpsc::UnboundedSender<String>> {
        let mut channels = self
            .channels
            .lock()
            .map_err(|_| AppError::Queue("broker lock poisoned".to_string()))?;
        Ok(channels
            .entry(queue.to_string())
            .or_insert_with(Channel::new)
            .tx
            .clone())
    }

    fn receiver(&self, queue: &str) -> AppResult<Arc<AsyncMutex<mpsc::UnboundedReceiver<String>>>> {
        let mut channels = self
            .channels
            .lock()
            .map_err(|_| AppError::Queue("broker lock poisoned".to_string()))?;
        Ok(channels
            .entry(queue.to_string())
            .or_insert_with(Channel::new)
            .rx
            .clone())
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn ensure_queue(&self, queue: &str) -> AppResult<()> {
        self.sender(queue).map(|_| ())
    }

    async fn publish(&self, queue: &str, payload: &str) -> AppResult<()> {
        self.sender(queue)?
            .send(payload.to_string())
            .map_err(|_| AppError::Queue(format!("queue {} is closed", queue)))
    }

    async fn receive(&self, queue: &str, _consumer: &str) -> AppResult<Option<Delivery>> {
        let rx = self.receiver(queue)?;

        let received = tokio::time::timeout(self.block, async {
            let mut rx = rx.lock().await;
            rx.recv().await
        })
        .await;

        match received {
            Ok(Some(payload)) => Ok(Some(Delivery {
                queue: queue.to_string(),
                id: self.next_id.fetch_add(1, Ordering::Relaxed).to_string(),
                payload,
            })),
            Ok(None) | Err(_) => Ok(None),
        }
    }

    async fn ack(&self, _delivery: &Delivery) -> AppResult<()> {
        Ok(())
    }
}
