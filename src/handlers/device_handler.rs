use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::models::common::ApiResponse;
use crate::models::DeviceCommand;
use crate::services::SyncCoordinator;

#[derive(Debug, Deserialize)]
pub struct DeviceCommandRequest {
    pub command: DeviceCommand,
}

#[tracing::instrument(name = "Send device command", skip(coordinator, request), fields(command = ?request.command))]
pub async fn send_device_command(
    coordinator: web::Data<Arc<SyncCoordinator>>,
    request: web::Json<DeviceCommandRequest>,
) -> HttpResponse {
    match coordinator.send_command(request.command).await {
        Ok(result) if result.success => {
            HttpResponse::Ok().json(ApiResponse::success("Command delivered", result))
        }
        Ok(result) => {
            let error = result.error_or("command declined by device");
            HttpResponse::UnprocessableEntity().json(ApiResponse::error_with_data(
                "Command declined",
                error,
                result,
            ))
        }
        Err(e) => {
            tracing::error!("❌ Failed to send command: {}", e);
            HttpResponse::BadGateway().json(ApiResponse::<()>::error(e.to_string()))
        }
    }
}

#[tracing::instrument(name = "Fetch device health data", skip(coordinator))]
pub async fn get_device_health(coordinator: web::Data<Arc<SyncCoordinator>>) -> HttpResponse {
    match coordinator.request_health_data().await {
        Ok(Some(snapshot)) => HttpResponse::Ok().json(ApiResponse::success("Health data", snapshot)),
        Ok(None) => HttpResponse::Ok().json(ApiResponse::<()>::success_message("No health data available")),
        Err(e) => {
            tracing::error!("❌ Failed to request health data: {}", e);
            HttpResponse::BadGateway().json(ApiResponse::<()>::error(e.to_string()))
        }
    }
}
