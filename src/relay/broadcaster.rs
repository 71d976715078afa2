// Subscriber set and status-event fan-out

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use super::models::StatusEvent;

pub type SubscriberId = u64;

/// Outgoing half of a subscriber connection; the socket writer task owns the
/// receiving end.
pub type SubscriberSender = mpsc::UnboundedSender<String>;

#[derive(Debug)]
struct Subscriber {
    tx: SubscriberSender,
    connected_at: chrono::DateTime<chrono::Utc>,
}

/// Per-subscriber result of a single broadcast
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: Vec<SubscriberId>,
    pub failed: Vec<(SubscriberId, String)>,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

/// Shared subscriber set
#[derive(Clone, Debug, Default)]
pub struct Broadcaster {
    subscribers: Arc<RwLock<HashMap<SubscriberId, Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, tx: SubscriberSender) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let subscriber = Subscriber {
            tx,
            connected_at: chrono::Utc::now(),
        };
        self.subscribers.write().await.insert(id, subscriber);
        tracing::debug!(subscriber_id = id, "Subscriber added");
        id
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub async fn unsubscribe(&self, id: SubscriberId) -> bool {
        match self.subscribers.write().await.remove(&id) {
            Some(subscriber) => {
                let connected_for = chrono::Utc::now() - subscriber.connected_at;
                tracing::debug!(
                    subscriber_id = id,
                    connected_secs = connected_for.num_seconds(),
                    "Subscriber removed"
                );
                true
            },
            None => false,
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Send `event` to every subscriber.
    ///
    /// A failed send is logged and recorded in the report; it never stops
    /// delivery to the rest and never removes the subscriber.
    pub async fn broadcast(&self, event: &StatusEvent) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        let message = match serde_json::to_string(event) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(device_id = %event.device_id, error = %e, "Failed to serialize status event");
                return report;
            },
        };

        let subscribers = self.subscribers.read().await;
        for (id, subscriber) in subscribers.iter() {
            match subscriber.tx.send(message.clone()) {
                Ok(()) => report.delivered.push(*id),
                Err(e) => {
                    tracing::warn!(
                        subscriber_id = *id,
                        device_id = %event.device_id,
                        error = %e,
                        "Error broadcasting to subscriber"
                    );
                    report.failed.push((*id, e.to_string()));
                },
            }
        }

        tracing::debug!(
            device_id = %event.device_id,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Status event broadcast"
        );
        report
    }
}
