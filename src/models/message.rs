use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCommand {
    Start,
    Stop,
    Pause,
    Resume,
    RequestHealthData,
    SyncSettings,
}

/// Fire-and-forget control message. Carries nothing beyond the command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub command: DeviceCommand,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(command: DeviceCommand) -> Self {
        Self {
            command,
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of a channel write. A failure here is data, not a fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommunicationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }

    /// The reported error, or `fallback` when the device gave none.
    pub fn error_or(&self, fallback: &str) -> String {
        match &self.error {
            Some(error) if !error.trim().is_empty() => error.clone(),
            _ => fallback.to_string(),
        }
    }
}
