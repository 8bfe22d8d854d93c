use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse};

use crate::handlers::device_handler::{get_device_health, send_device_command, DeviceCommandRequest};
use crate::services::SyncCoordinator;

#[post("/command")]
pub async fn device_command(
    coordinator: web::Data<Arc<SyncCoordinator>>,
    request: web::Json<DeviceCommandRequest>,
) -> HttpResponse {
    send_device_command(coordinator, request).await
}

#[get("/health")]
pub async fn device_health(coordinator: web::Data<Arc<SyncCoordinator>>) -> HttpResponse {
    get_device_health(coordinator).await
}
