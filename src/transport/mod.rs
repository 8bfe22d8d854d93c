//! Abstract channel to the companion wearable.
//!
//! The coordinator only ever talks to a [`DeviceChannel`]. The wire underneath
//! (HTTP relay, Bluetooth bridge, in-memory double) is pluggable.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CommunicationResult, HealthSnapshot, Message, UserSyncSettings, WorkoutSession};

pub mod http_channel;
pub mod mock_channel;

pub use http_channel::HttpDeviceChannel;
pub use mock_channel::{CallGate, ChannelCall, ChannelOperation, ScriptedDeviceChannel, ScriptedOutcome};

/// Hard failures raised by the channel itself. These always stop a cycle.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Device not connected")]
    NotConnected,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait DeviceChannel: Send + Sync {
    /// Send a control command.
    async fn send_message(&self, message: &Message) -> Result<CommunicationResult, TransportError>;

    /// Push one workout session to the device.
    async fn send_workout_session(
        &self,
        session: &WorkoutSession,
    ) -> Result<CommunicationResult, TransportError>;

    /// Push the user's settings to the device.
    async fn sync_user_settings(
        &self,
        settings: &UserSyncSettings,
    ) -> Result<CommunicationResult, TransportError>;

    /// Pull one health snapshot. `Ok(None)` means the device had no data.
    async fn request_health_data(&self) -> Result<Option<HealthSnapshot>, TransportError>;

    /// Every session the device currently holds. Non-destructive, so the same
    /// session may be returned on every call.
    async fn pull_workout_sessions(&self) -> Result<Vec<WorkoutSession>, TransportError>;

    fn is_connected(&self) -> bool;

    fn connection_status(&self) -> String;
}
