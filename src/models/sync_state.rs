use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Syncing,
    Completed,
    Failed(String),
}

impl SyncState {
    pub fn is_syncing(&self) -> bool {
        matches!(self, SyncState::Syncing)
    }
}

impl Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncState::Idle => write!(f, "idle"),
            SyncState::Syncing => write!(f, "syncing"),
            SyncState::Completed => write!(f, "completed"),
            SyncState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// The five ordered steps of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    PushSettings,
    PushSessions,
    RequestHealthData,
    PullSessions,
    Finalize,
}

impl SyncPhase {
    pub const ALL: [SyncPhase; 5] = [
        SyncPhase::PushSettings,
        SyncPhase::PushSessions,
        SyncPhase::RequestHealthData,
        SyncPhase::PullSessions,
        SyncPhase::Finalize,
    ];

    pub fn progress(&self) -> f64 {
        match self {
            SyncPhase::PushSettings => 0.1,
            SyncPhase::PushSessions => 0.3,
            SyncPhase::RequestHealthData => 0.5,
            SyncPhase::PullSessions => 0.8,
            SyncPhase::Finalize => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::PushSettings => "push_settings",
            SyncPhase::PushSessions => "push_sessions",
            SyncPhase::RequestHealthData => "request_health_data",
            SyncPhase::PullSessions => "pull_sessions",
            SyncPhase::Finalize => "finalize",
        }
    }
}

impl Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters for one cycle. Kept for partially failed cycles too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub settings_pushed: bool,
    pub sessions_pushed: usize,
    pub snapshot_received: bool,
    pub sessions_inserted: usize,
    pub sessions_updated: usize,
    pub sessions_unchanged: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub progress: f64,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub last_report: Option<CycleReport>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            state: SyncState::Idle,
            progress: 0.0,
            last_sync_at: None,
            error: None,
            last_report: None,
        }
    }
}
