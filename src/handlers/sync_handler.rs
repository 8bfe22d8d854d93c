use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::models::common::ApiResponse;
use crate::models::SyncStatus;
use crate::services::{AutoSyncScheduler, SyncCoordinator, SyncOutcome};

#[derive(Debug, Serialize)]
pub struct SyncRunResponse {
    pub outcome: SyncOutcome,
    pub status: SyncStatus,
}

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub status: SyncStatus,
    pub device_connected: bool,
    pub connection_status: String,
    pub auto_sync_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AutoSyncRequest {
    /// 0 disarms auto-sync.
    pub interval_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct AutoSyncResponse {
    pub auto_sync_interval_secs: Option<u64>,
}

#[tracing::instrument(name = "Run sync cycle", skip(coordinator))]
pub async fn run_sync(coordinator: web::Data<Arc<SyncCoordinator>>) -> HttpResponse {
    // Own task: a client hanging up must not cancel the cycle mid-merge.
    let cycle = coordinator.get_ref().clone();
    let outcome = match tokio::spawn(async move { cycle.perform_sync().await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("❌ Sync task failed: {}", e);
            return HttpResponse::InternalServerError().json(ApiResponse::<()>::error("Sync task failed"));
        }
    };
    let status = coordinator.status();

    let (message, error) = match &outcome {
        SyncOutcome::Completed { .. } => ("Sync completed", None),
        SyncOutcome::Skipped => ("Sync already in progress", Some("sync already in progress".to_string())),
        SyncOutcome::Failed { reason, .. } => ("Sync failed", Some(reason.clone())),
    };
    let skipped = outcome == SyncOutcome::Skipped;
    let body = SyncRunResponse { outcome, status };

    match error {
        None => HttpResponse::Ok().json(ApiResponse::success(message, body)),
        Some(error) if skipped => {
            HttpResponse::Conflict().json(ApiResponse::error_with_data(message, error, body))
        }
        Some(error) => HttpResponse::BadGateway().json(ApiResponse::error_with_data(message, error, body)),
    }
}

pub async fn get_sync_status(
    coordinator: web::Data<Arc<SyncCoordinator>>,
    scheduler: web::Data<Arc<AutoSyncScheduler>>,
) -> HttpResponse {
    let response = SyncStatusResponse {
        status: coordinator.status(),
        device_connected: coordinator.is_device_connected(),
        connection_status: coordinator.connection_status(),
        auto_sync_interval_secs: scheduler.active_interval().await.map(|i| i.as_secs()),
    };
    HttpResponse::Ok().json(ApiResponse::success("Sync status", response))
}

#[tracing::instrument(name = "Configure auto-sync", skip(scheduler, request), fields(interval_secs = %request.interval_secs))]
pub async fn configure_auto_sync(
    scheduler: web::Data<Arc<AutoSyncScheduler>>,
    request: web::Json<AutoSyncRequest>,
) -> HttpResponse {
    let result = if request.interval_secs == 0 {
        scheduler.cancel().await.map(|_| ())
    } else {
        scheduler
            .schedule(Duration::from_secs(request.interval_secs))
            .await
            .map(|_| ())
    };

    match result {
        Ok(()) => {
            let response = AutoSyncResponse {
                auto_sync_interval_secs: scheduler.active_interval().await.map(|i| i.as_secs()),
            };
            HttpResponse::Ok().json(ApiResponse::success("Auto-sync updated", response))
        }
        Err(e) => {
            tracing::error!("❌ Failed to update auto-sync: {}", e);
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error("Failed to update auto-sync"))
        }
    }
}
