//! In-process fan-out of sync events.
//!
//! Delivery is at-most-once: events published with no subscriber are dropped,
//! and a subscriber that falls behind skips what it missed.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::models::{HealthSnapshot, SyncStatus};

pub const HEALTH_SNAPSHOT_TOPIC: &str = "health.snapshot";
pub const SYNC_PROGRESS_TOPIC: &str = "sync.progress";

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum BusEvent {
    HealthSnapshot(HealthSnapshot),
    SyncStatus(SyncStatus),
}

#[derive(Clone)]
pub struct NotificationBus {
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<BusEvent>>>>,
    capacity: usize,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, topic: &str, event: BusEvent) -> usize {
        match self.sender(topic).send(event) {
            Ok(receivers) => {
                tracing::debug!("📢 Published event on {} to {} subscribers", topic, receivers);
                receivers
            }
            Err(_) => {
                tracing::debug!("No subscribers on {}, event dropped", topic);
                0
            }
        }
    }

    pub fn subscribe(&self, topic: &str) -> BoxStream<'static, BusEvent> {
        let receiver = self.sender(topic).subscribe();
        let topic = topic.to_string();
        stream::unfold((receiver, topic), |(mut receiver, topic)| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, (receiver, topic))),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Subscriber on {} lagged, skipped {} events", topic, skipped);
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }

    pub fn publish_health_snapshot(&self, snapshot: &HealthSnapshot) -> usize {
        self.publish(HEALTH_SNAPSHOT_TOPIC, BusEvent::HealthSnapshot(snapshot.clone()))
    }

    pub fn subscribe_health_snapshots(&self) -> BoxStream<'static, HealthSnapshot> {
        self.subscribe(HEALTH_SNAPSHOT_TOPIC)
            .filter_map(|event| async move {
                match event {
                    BusEvent::HealthSnapshot(snapshot) => Some(snapshot),
                    _ => None,
                }
            })
            .boxed()
    }

    pub fn publish_sync_status(&self, status: &SyncStatus) -> usize {
        self.publish(SYNC_PROGRESS_TOPIC, BusEvent::SyncStatus(status.clone()))
    }

    pub fn subscribe_sync_progress(&self) -> BoxStream<'static, SyncStatus> {
        self.subscribe(SYNC_PROGRESS_TOPIC)
            .filter_map(|event| async move {
                match event {
                    BusEvent::SyncStatus(status) => Some(status),
                    _ => None,
                }
            })
            .boxed()
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<BusEvent> {
        if let Ok(topics) = self.topics.read() {
            if let Some(sender) = topics.get(topic) {
                return sender.clone();
            }
        }

        let mut topics = match self.topics.write() {
            Ok(topics) => topics,
            Err(poisoned) => poisoned.into_inner(),
        };
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}
