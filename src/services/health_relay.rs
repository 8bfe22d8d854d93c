use std::sync::Arc;

use futures::StreamExt;
use redis::AsyncCommands;
use tokio::task::JoinHandle;

use crate::models::HealthSnapshot;
use crate::services::notification_bus::NotificationBus;

pub const DEFAULT_HEALTH_CHANNEL: &str = "health:snapshots";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Forwards health snapshots from the bus to a Redis pub/sub channel.
#[derive(Clone)]
pub struct RedisHealthRelay {
    redis_client: Arc<redis::Client>,
    channel: String,
}

impl RedisHealthRelay {
    pub fn new(redis_client: Arc<redis::Client>, channel: impl Into<String>) -> Self {
        Self {
            redis_client,
            channel: channel.into(),
        }
    }

    pub async fn publish(&self, snapshot: &HealthSnapshot) -> Result<i32, RelayError> {
        let mut conn = self.redis_client.get_async_connection().await?;
        let message = serde_json::to_string(snapshot)?;
        let subscriber_count: i32 = conn.publish(&self.channel, message).await?;
        Ok(subscriber_count)
    }

    /// Subscribe to the bus and forward until the bus goes away.
    pub fn spawn(self, bus: &NotificationBus) -> JoinHandle<()> {
        let mut snapshots = bus.subscribe_health_snapshots();
        tokio::spawn(async move {
            while let Some(snapshot) = snapshots.next().await {
                match self.publish(&snapshot).await {
                    Ok(subscriber_count) => {
                        tracing::debug!("✅ Health snapshot relayed to {} subscribers on {}", subscriber_count, self.channel);
                    }
                    Err(e) => {
                        tracing::error!("❌ Failed to relay health snapshot to {}: {}", self.channel, e);
                    }
                }
            }
        })
    }
}
