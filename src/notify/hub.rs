//! Notification hub

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::error::AppResult;

/// Identifies one registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    tx: mpsc::Sender<String>,
}

/// Registry of live listeners keyed by submission id.
///
/// Broadcasts take the read lock, registration changes the write lock.
/// Delivery never blocks: a listener whose buffer is full or whose
/// connection is gone misses the update.
#[derive(Default)]
pub struct NotificationHub {
    listeners: RwLock<HashMap<Uuid, Vec<Listener>>>,
    next_id: AtomicU64,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener for a submission
    pub fn register(&self, submission_id: Uuid, tx: mpsc::Sender<String>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners
            .entry(submission_id)
            .or_default()
            .push(Listener { id, tx });

        tracing::debug!(submission_id = %submission_id, listener = id.0, "Listener registered");
        id
    }

    /// Create a buffered channel and register its sending half
    pub fn subscribe(&self, submission_id: Uuid, buffer: usize) -> (ListenerId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer);
        (self.register(submission_id, tx), rx)
    }

    /// Remove one listener; the entry goes away with its last listener
    pub fn unregister(&self, submission_id: Uuid, listener: ListenerId) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());

        if let Some(entries) = listeners.get_mut(&submission_id) {
            entries.retain(|entry| entry.id != listener);
            if entries.is_empty() {
                listeners.remove(&submission_id);
            }
        }

        tracing::debug!(submission_id = %submission_id, listener = listener.0, "Listener unregistered");
    }

    /// Send a payload to every listener of a submission.
    /// Returns how many listeners accepted it.
    pub fn broadcast<T: Serialize>(&self, submission_id: Uuid, payload: &T) -> AppResult<usize> {
        let message = serde_json::to_string(payload)?;

        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        let Some(entries) = listeners.get(&submission_id) else {
            return Ok(0);
        };

        let mut delivered = 0;
        for entry in entries {
            match entry.tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        submission_id = %submission_id,
                        listener = entry.id.0,
                        "Listener buffer full, dropping update"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::warn!(
                        submission_id = %submission_id,
                        listener = entry.id.0,
                        "Listener connection closed, skipping"
                    );
                }
            }
        }

        tracing::debug!(
            submission_id = %submission_id,
            delivered,
            listeners = entries.len(),
            "Broadcast sent"
        );
        Ok(delivered)
    }

    /// Number of listeners watching a submission
    pub fn listener_count(&self, submission_id: Uuid) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&submission_id)
            .map_or(0, Vec::len)
    }

    /// Number of submissions with at least one listener
    pub fn watched_submissions(&self) -> usize {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
