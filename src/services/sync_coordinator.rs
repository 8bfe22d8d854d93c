//! Drives one sync cycle between the canonical store and the wearable.
//!
//! A cycle runs five phases in order:
//!
//! 1. push the user's settings (progress 0.1)
//! 2. push finalized canonical sessions the device does not hold yet (0.3)
//! 3. pull one health snapshot and republish it on the bus (0.5)
//! 4. pull device sessions and merge each into the store (0.8)
//! 5. mark the cycle completed (1.0)
//!
//! The first fault or rejected write stops the cycle. Earlier phases are not
//! undone; the next cycle converges because merging is idempotent.
//! Only one cycle runs at a time. A trigger that arrives while a cycle is in
//! flight is dropped.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::db::{StoreError, WorkoutStore};
use crate::models::{
    CommunicationResult, CycleReport, DeviceCommand, HealthSnapshot, Message, SyncPhase, SyncState,
    SyncStatus,
};
use crate::services::notification_bus::NotificationBus;
use crate::services::profile_provider::UserProfileProvider;
use crate::transport::{DeviceChannel, TransportError};
use crate::workout::session_merge::{merge_session, MergeOutcome};

pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Settings push rejected: {0}")]
    SettingsRejected(String),

    #[error("Session push rejected for {session_id}: {reason}")]
    SessionPushRejected { session_id: Uuid, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to merge session {session_id}: {source}")]
    MergeFailed {
        session_id: Uuid,
        #[source]
        source: StoreError,
    },

    #[error("{phase} timed out after {seconds} s")]
    PhaseTimedOut { phase: SyncPhase, seconds: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed { report: CycleReport },
    Failed { reason: String, report: CycleReport },
    /// Another cycle was already running.
    Skipped,
}

pub struct SyncCoordinator {
    channel: Arc<dyn DeviceChannel>,
    store: Arc<dyn WorkoutStore>,
    profile: Arc<dyn UserProfileProvider>,
    bus: NotificationBus,
    phase_timeout: Duration,
    status: watch::Sender<SyncStatus>,
    // Session ids the device is known to hold.
    device_ledger: Mutex<HashSet<Uuid>>,
}

impl SyncCoordinator {
    pub fn new(
        channel: Arc<dyn DeviceChannel>,
        store: Arc<dyn WorkoutStore>,
        profile: Arc<dyn UserProfileProvider>,
        bus: NotificationBus,
    ) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        Self {
            channel,
            store,
            profile,
            bus,
            phase_timeout: DEFAULT_PHASE_TIMEOUT,
            status,
            device_ledger: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_phase_timeout(mut self, phase_timeout: Duration) -> Self {
        self.phase_timeout = phase_timeout;
        self
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn is_syncing(&self) -> bool {
        self.status.borrow().state.is_syncing()
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn is_device_connected(&self) -> bool {
        self.channel.is_connected()
    }

    pub fn connection_status(&self) -> String {
        self.channel.connection_status()
    }

    /// Run one cycle. Never fails: the result is the returned outcome and
    /// the observable status.
    #[tracing::instrument(name = "Sync cycle", skip(self))]
    pub async fn perform_sync(&self) -> SyncOutcome {
        if !self.try_begin() {
            tracing::info!("⏭️ Sync already in progress, dropping trigger");
            return SyncOutcome::Skipped;
        }

        let mut cycle = CycleGuard {
            coordinator: self,
            settled: false,
        };
        let mut report = CycleReport::default();

        tracing::info!("🔄 Starting sync cycle ({})", self.channel.connection_status());
        let outcome = match self.run_phases(&mut report).await {
            Ok(()) => {
                self.finish_completed(&report);
                tracing::info!(
                    "✅ Sync completed: {} pushed, {} inserted, {} updated, {} unchanged",
                    report.sessions_pushed,
                    report.sessions_inserted,
                    report.sessions_updated,
                    report.sessions_unchanged
                );
                SyncOutcome::Completed { report }
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!("❌ Sync failed: {}", reason);
                self.finish_failed(reason.clone(), &report);
                SyncOutcome::Failed { reason, report }
            }
        };
        cycle.settled = true;
        outcome
    }

    /// Pull one snapshot outside a cycle and republish it.
    #[tracing::instrument(name = "Request health data", skip(self))]
    pub async fn request_health_data(&self) -> Result<Option<HealthSnapshot>, SyncError> {
        let snapshot = self
            .call(SyncPhase::RequestHealthData, self.channel.request_health_data())
            .await?;
        if let Some(snapshot) = &snapshot {
            self.bus.publish_health_snapshot(snapshot);
        }
        Ok(snapshot)
    }

    #[tracing::instrument(name = "Send device command", skip(self))]
    pub async fn send_command(&self, command: DeviceCommand) -> Result<CommunicationResult, SyncError> {
        let message = Message::new(command);
        let result = match tokio::time::timeout(self.phase_timeout, self.channel.send_message(&message)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SyncError::Transport(TransportError::SendFailed(format!(
                    "command timed out after {} s",
                    self.phase_timeout.as_secs()
                ))))
            }
        };
        if !result.success {
            tracing::warn!("Device declined {:?}: {}", command, result.error_or("no reason given"));
        }
        Ok(result)
    }

    async fn run_phases(&self, report: &mut CycleReport) -> Result<(), SyncError> {
        self.enter_phase(SyncPhase::PushSettings);
        self.push_settings().await?;
        report.settings_pushed = true;

        self.enter_phase(SyncPhase::PushSessions);
        self.push_outbound_sessions(report).await?;

        self.enter_phase(SyncPhase::RequestHealthData);
        report.snapshot_received = self.pull_health_snapshot().await?;

        self.enter_phase(SyncPhase::PullSessions);
        self.pull_inbound_sessions(report).await?;

        Ok(())
    }

    async fn push_settings(&self) -> Result<(), SyncError> {
        let settings = self.profile.current_profile().to_sync_settings();
        let result = self
            .call(SyncPhase::PushSettings, self.channel.sync_user_settings(&settings))
            .await?;
        if !result.success {
            return Err(SyncError::SettingsRejected(
                result.error_or("settings push rejected by device"),
            ));
        }
        tracing::debug!("Pushed settings ({} preferred categories)", settings.preferred_categories.len());
        Ok(())
    }

    async fn push_outbound_sessions(&self, report: &mut CycleReport) -> Result<(), SyncError> {
        let sessions = self.store.fetch_all().await?;
        let pending: Vec<_> = {
            let ledger = self.ledger();
            sessions
                .into_iter()
                .filter(|s| !s.is_active && !ledger.contains(&s.id))
                .collect()
        };
        tracing::info!("📤 {} sessions to push to device", pending.len());

        for session in pending {
            let result = self
                .call(SyncPhase::PushSessions, self.channel.send_workout_session(&session))
                .await?;
            if !result.success {
                return Err(SyncError::SessionPushRejected {
                    session_id: session.id,
                    reason: result.error_or("session push rejected by device"),
                });
            }
            self.ledger().insert(session.id);
            report.sessions_pushed += 1;
        }
        Ok(())
    }

    async fn pull_health_snapshot(&self) -> Result<bool, SyncError> {
        let snapshot = self
            .call(SyncPhase::RequestHealthData, self.channel.request_health_data())
            .await?;
        match snapshot {
            Some(snapshot) => {
                self.bus.publish_health_snapshot(&snapshot);
                Ok(true)
            }
            None => {
                tracing::debug!("Device had no health data");
                Ok(false)
            }
        }
    }

    async fn pull_inbound_sessions(&self, report: &mut CycleReport) -> Result<(), SyncError> {
        let incoming = self
            .call(SyncPhase::PullSessions, self.channel.pull_workout_sessions())
            .await?;
        tracing::info!("📥 Merging {} sessions from device", incoming.len());

        for session in &incoming {
            let outcome = merge_session(self.store.as_ref(), session)
                .await
                .map_err(|source| SyncError::MergeFailed {
                    session_id: session.id,
                    source,
                })?;
            self.ledger().insert(session.id);
            match outcome {
                MergeOutcome::Inserted => report.sessions_inserted += 1,
                MergeOutcome::Updated => report.sessions_updated += 1,
                MergeOutcome::Unchanged => report.sessions_unchanged += 1,
            }
        }
        Ok(())
    }

    async fn call<T, F>(&self, phase: SyncPhase, call: F) -> Result<T, SyncError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        match tokio::time::timeout(self.phase_timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(SyncError::PhaseTimedOut {
                phase,
                seconds: self.phase_timeout.as_secs(),
            }),
        }
    }

    /// Atomically move to `syncing` unless a cycle is already running.
    fn try_begin(&self) -> bool {
        self.status.send_if_modified(|status| {
            if status.state.is_syncing() {
                return false;
            }
            status.state = SyncState::Syncing;
            status.progress = 0.0;
            status.error = None;
            true
        })
    }

    fn enter_phase(&self, phase: SyncPhase) {
        tracing::debug!("Entering phase {}", phase);
        self.status.send_modify(|status| status.progress = phase.progress());
        self.bus.publish_sync_status(&self.status());
    }

    fn finish_completed(&self, report: &CycleReport) {
        self.status.send_modify(|status| {
            status.state = SyncState::Completed;
            status.progress = SyncPhase::Finalize.progress();
            status.last_sync_at = Some(Utc::now());
            status.error = None;
            status.last_report = Some(report.clone());
        });
        self.bus.publish_sync_status(&self.status());
    }

    fn finish_failed(&self, reason: String, report: &CycleReport) {
        self.status.send_modify(|status| {
            status.state = SyncState::Failed(reason.clone());
            status.error = Some(reason);
            status.last_report = Some(report.clone());
        });
        self.bus.publish_sync_status(&self.status());
    }

    fn ledger(&self) -> MutexGuard<'_, HashSet<Uuid>> {
        match self.device_ledger.lock() {
            Ok(ledger) => ledger,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Leaves the coordinator in `failed` if a cycle future is dropped mid-flight.
struct CycleGuard<'a> {
    coordinator: &'a SyncCoordinator,
    settled: bool,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Sync cycle dropped before finishing");
            self.coordinator
                .finish_failed("sync cycle cancelled".to_string(), &CycleReport::default());
        }
    }
}
