//! Deterministic in-memory channel used to drive the coordinator in tests
//! and local runs without a paired device.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::models::{
    CommunicationResult, DeviceCommand, HealthSnapshot, Message, UserSyncSettings, WorkoutSession,
};
use crate::transport::{DeviceChannel, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelOperation {
    SendMessage,
    SendWorkoutSession,
    SyncUserSettings,
    RequestHealthData,
    PullWorkoutSessions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    Succeed,
    /// Writes answer `success=false` with this text; reads raise `ReceiveFailed`.
    Reject(String),
    /// Raise `SendFailed` / `ReceiveFailed` with this text.
    Fault(String),
    /// Never return.
    Hang,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    SendMessage(DeviceCommand),
    SendWorkoutSession(Uuid),
    SyncUserSettings,
    RequestHealthData,
    PullWorkoutSessions,
}

/// Holds the first call of one operation until released.
#[derive(Debug, Clone, Default)]
pub struct CallGate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl CallGate {
    pub async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
struct ScriptState {
    connected: bool,
    outcomes: HashMap<ChannelOperation, ScriptedOutcome>,
    device_sessions: Vec<WorkoutSession>,
    snapshot: Option<HealthSnapshot>,
    received_sessions: Vec<WorkoutSession>,
    received_settings: Vec<UserSyncSettings>,
    calls: Vec<ChannelCall>,
    gate: Option<(ChannelOperation, CallGate)>,
}

pub struct ScriptedDeviceChannel {
    state: Mutex<ScriptState>,
}

impl Default for ScriptedDeviceChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedDeviceChannel {
    /// A connected channel where every operation succeeds.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScriptState {
                connected: true,
                ..ScriptState::default()
            }),
        }
    }

    /// Every operation reports `reason` as its failure.
    pub fn always_failing(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let channel = Self::new();
        {
            let mut state = channel.lock();
            for operation in [
                ChannelOperation::SendMessage,
                ChannelOperation::SendWorkoutSession,
                ChannelOperation::SyncUserSettings,
                ChannelOperation::RequestHealthData,
                ChannelOperation::PullWorkoutSessions,
            ] {
                state.outcomes.insert(operation, ScriptedOutcome::Reject(reason.clone()));
            }
        }
        channel
    }

    pub fn with_outcome(self, operation: ChannelOperation, outcome: ScriptedOutcome) -> Self {
        self.set_outcome(operation, outcome);
        self
    }

    pub fn with_device_sessions(self, sessions: Vec<WorkoutSession>) -> Self {
        self.lock().device_sessions = sessions;
        self
    }

    pub fn with_snapshot(self, snapshot: HealthSnapshot) -> Self {
        self.lock().snapshot = Some(snapshot);
        self
    }

    pub fn disconnected(self) -> Self {
        self.lock().connected = false;
        self
    }

    pub fn set_outcome(&self, operation: ChannelOperation, outcome: ScriptedOutcome) {
        self.lock().outcomes.insert(operation, outcome);
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    pub fn record_on_device(&self, session: WorkoutSession) {
        let mut state = self.lock();
        state.device_sessions.retain(|s| s.id != session.id);
        state.device_sessions.push(session);
    }

    /// Gate the next call of `operation`.
    pub fn hold(&self, operation: ChannelOperation) -> CallGate {
        let gate = CallGate::default();
        self.lock().gate = Some((operation, gate.clone()));
        gate
    }

    pub fn calls(&self) -> Vec<ChannelCall> {
        self.lock().calls.clone()
    }

    pub fn received_sessions(&self) -> Vec<WorkoutSession> {
        self.lock().received_sessions.clone()
    }

    pub fn received_settings(&self) -> Vec<UserSyncSettings> {
        self.lock().received_settings.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record the call, then wait on a gate or hang if scripted to.
    async fn enter(&self, operation: ChannelOperation, call: ChannelCall) -> Result<ScriptedOutcome, TransportError> {
        let (outcome, gate) = {
            let mut state = self.lock();
            state.calls.push(call);
            if !state.connected {
                return Err(TransportError::NotConnected);
            }
            let gated = matches!(&state.gate, Some((gated, _)) if *gated == operation);
            let gate = if gated {
                state.gate.take().map(|(_, gate)| gate)
            } else {
                None
            };
            let outcome = state
                .outcomes
                .get(&operation)
                .cloned()
                .unwrap_or(ScriptedOutcome::Succeed);
            (outcome, gate)
        };

        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if outcome == ScriptedOutcome::Hang {
            std::future::pending::<()>().await;
        }
        Ok(outcome)
    }

    fn write_outcome(outcome: ScriptedOutcome) -> Result<CommunicationResult, TransportError> {
        match outcome {
            ScriptedOutcome::Succeed | ScriptedOutcome::Hang => Ok(CommunicationResult::ok()),
            ScriptedOutcome::Reject(reason) => Ok(CommunicationResult::failure(reason)),
            ScriptedOutcome::Fault(reason) => Err(TransportError::SendFailed(reason)),
        }
    }

    fn read_outcome(outcome: ScriptedOutcome) -> Result<(), TransportError> {
        match outcome {
            ScriptedOutcome::Succeed | ScriptedOutcome::Hang => Ok(()),
            ScriptedOutcome::Reject(reason) | ScriptedOutcome::Fault(reason) => {
                Err(TransportError::ReceiveFailed(reason))
            }
        }
    }
}

#[async_trait]
impl DeviceChannel for ScriptedDeviceChannel {
    async fn send_message(&self, message: &Message) -> Result<CommunicationResult, TransportError> {
        let outcome = self
            .enter(ChannelOperation::SendMessage, ChannelCall::SendMessage(message.command))
            .await?;
        Self::write_outcome(outcome)
    }

    async fn send_workout_session(
        &self,
        session: &WorkoutSession,
    ) -> Result<CommunicationResult, TransportError> {
        let outcome = self
            .enter(
                ChannelOperation::SendWorkoutSession,
                ChannelCall::SendWorkoutSession(session.id),
            )
            .await?;
        let result = Self::write_outcome(outcome)?;
        if result.success {
            let mut state = self.lock();
            state.received_sessions.push(session.clone());
            state.device_sessions.retain(|s| s.id != session.id);
            state.device_sessions.push(session.clone());
        }
        Ok(result)
    }

    async fn sync_user_settings(
        &self,
        settings: &UserSyncSettings,
    ) -> Result<CommunicationResult, TransportError> {
        let outcome = self
            .enter(ChannelOperation::SyncUserSettings, ChannelCall::SyncUserSettings)
            .await?;
        let result = Self::write_outcome(outcome)?;
        if result.success {
            self.lock().received_settings.push(settings.clone());
        }
        Ok(result)
    }

    async fn request_health_data(&self) -> Result<Option<HealthSnapshot>, TransportError> {
        let outcome = self
            .enter(ChannelOperation::RequestHealthData, ChannelCall::RequestHealthData)
            .await?;
        Self::read_outcome(outcome)?;
        Ok(self.lock().snapshot.clone())
    }

    async fn pull_workout_sessions(&self) -> Result<Vec<WorkoutSession>, TransportError> {
        let outcome = self
            .enter(ChannelOperation::PullWorkoutSessions, ChannelCall::PullWorkoutSessions)
            .await?;
        Self::read_outcome(outcome)?;
        Ok(self.lock().device_sessions.clone())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn connection_status(&self) -> String {
        if self.is_connected() {
            "connected (scripted)".to_string()
        } else {
            "disconnected (scripted)".to_string()
        }
    }
}
