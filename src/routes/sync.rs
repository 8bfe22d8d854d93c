use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse};

use crate::handlers::sync_handler::{configure_auto_sync, get_sync_status, run_sync, AutoSyncRequest};
use crate::services::{AutoSyncScheduler, SyncCoordinator};

#[post("/run")]
pub async fn run_sync_cycle(coordinator: web::Data<Arc<SyncCoordinator>>) -> HttpResponse {
    run_sync(coordinator).await
}

#[get("/status")]
pub async fn sync_status(
    coordinator: web::Data<Arc<SyncCoordinator>>,
    scheduler: web::Data<Arc<AutoSyncScheduler>>,
) -> HttpResponse {
    get_sync_status(coordinator, scheduler).await
}

#[post("/auto")]
pub async fn auto_sync(
    scheduler: web::Data<Arc<AutoSyncScheduler>>,
    request: web::Json<AutoSyncRequest>,
) -> HttpResponse {
    configure_auto_sync(scheduler, request).await
}
