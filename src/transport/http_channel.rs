use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};

use crate::config::settings::DeviceSettings;
use crate::models::{CommunicationResult, HealthSnapshot, Message, UserSyncSettings, WorkoutSession};
use crate::transport::{DeviceChannel, TransportError};

/// JSON-over-HTTP adapter talking to the relay that fronts the wearable.
pub struct HttpDeviceChannel {
    base_url: String,
    api_key: SecretString,
    client: Client,
    timeout: Duration,
    connected: AtomicBool,
    last_error: RwLock<Option<String>>,
}

impl HttpDeviceChannel {
    pub fn new(base_url: String, api_key: SecretString, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
            timeout,
            connected: AtomicBool::new(false),
            last_error: RwLock::new(None),
        }
    }

    pub fn from_settings(settings: &DeviceSettings) -> Self {
        Self::new(
            settings.relay_url.clone(),
            settings.api_key.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("X-API-Key", self.api_key.expose_secret())
            .timeout(self.timeout)
    }

    async fn dispatch(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        match self.authorized(request).send().await {
            Ok(response) => {
                self.mark_connected();
                Ok(response)
            }
            Err(e) if e.is_connect() || e.is_timeout() => {
                self.mark_disconnected(e.to_string());
                tracing::warn!("📡 Device relay unreachable at {}: {}", self.base_url, e);
                Err(TransportError::NotConnected)
            }
            Err(e) => {
                self.mark_disconnected(e.to_string());
                Err(TransportError::Http(e))
            }
        }
    }

    /// Map a write response onto a `CommunicationResult`.
    /// 4xx is the device declining the write; 5xx is a hard fault.
    async fn write_result(response: Response) -> Result<CommunicationResult, TransportError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

        if status.is_server_error() {
            return Err(TransportError::SendFailed(format!("relay returned {}: {}", status, body)));
        }

        if body.trim().is_empty() {
            return Ok(if status.is_success() {
                CommunicationResult::ok()
            } else {
                CommunicationResult::failure(format!("relay returned {}", status))
            });
        }

        match serde_json::from_str::<CommunicationResult>(&body) {
            Ok(result) => Ok(result),
            Err(_) if status.is_client_error() => {
                Ok(CommunicationResult::failure(format!("relay returned {}: {}", status, body)))
            }
            Err(e) => Err(TransportError::MalformedPayload(e.to_string())),
        }
    }

    fn mark_connected(&self) {
        self.connected.store(true, Ordering::SeqCst);
        if let Ok(mut last_error) = self.last_error.write() {
            *last_error = None;
        }
    }

    fn mark_disconnected(&self, reason: String) {
        self.connected.store(false, Ordering::SeqCst);
        if let Ok(mut last_error) = self.last_error.write() {
            *last_error = Some(reason);
        }
    }
}

#[async_trait]
impl DeviceChannel for HttpDeviceChannel {
    #[tracing::instrument(name = "Send device message", skip(self), fields(command = ?message.command))]
    async fn send_message(&self, message: &Message) -> Result<CommunicationResult, TransportError> {
        let response = self
            .dispatch(self.client.post(self.url("/messages")).json(message))
            .await?;
        Self::write_result(response).await
    }

    #[tracing::instrument(name = "Send workout session", skip(self, session), fields(session_id = %session.id))]
    async fn send_workout_session(
        &self,
        session: &WorkoutSession,
    ) -> Result<CommunicationResult, TransportError> {
        let response = self
            .dispatch(self.client.post(self.url("/sessions")).json(session))
            .await?;
        Self::write_result(response).await
    }

    #[tracing::instrument(name = "Sync user settings", skip(self, settings))]
    async fn sync_user_settings(
        &self,
        settings: &UserSyncSettings,
    ) -> Result<CommunicationResult, TransportError> {
        let response = self
            .dispatch(self.client.put(self.url("/settings")).json(settings))
            .await?;
        Self::write_result(response).await
    }

    #[tracing::instrument(name = "Request health data", skip(self))]
    async fn request_health_data(&self) -> Result<Option<HealthSnapshot>, TransportError> {
        let response = self.dispatch(self.client.get(self.url("/health"))).await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT || status == StatusCode::NOT_FOUND {
            tracing::debug!("No health data available on device");
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransportError::ReceiveFailed(format!("relay returned {}: {}", status, error_text)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
        let snapshot = serde_json::from_slice::<Option<HealthSnapshot>>(&body)
            .map_err(|e| TransportError::MalformedPayload(e.to_string()))?;
        Ok(snapshot)
    }

    #[tracing::instrument(name = "Pull workout sessions", skip(self))]
    async fn pull_workout_sessions(&self) -> Result<Vec<WorkoutSession>, TransportError> {
        let response = self.dispatch(self.client.get(self.url("/sessions"))).await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransportError::ReceiveFailed(format!("relay returned {}: {}", status, error_text)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
        let sessions = serde_json::from_slice::<Vec<WorkoutSession>>(&body)
            .map_err(|e| TransportError::MalformedPayload(e.to_string()))?;
        tracing::info!("📥 Device reported {} workout sessions", sessions.len());
        Ok(sessions)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn connection_status(&self) -> String {
        if self.is_connected() {
            return format!("connected to {}", self.base_url);
        }
        match self.last_error.read().ok().and_then(|e| e.clone()) {
            Some(reason) => format!("disconnected: {}", reason),
            None => "not yet contacted".to_string(),
        }
    }
}
