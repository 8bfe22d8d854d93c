use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

pub mod config;
pub mod db;
mod handlers;
pub mod models;
mod routes;
pub mod services;
pub mod telemetry;
pub mod transport;
pub mod workout;

use crate::routes::init_routes;
use crate::services::{AutoSyncScheduler, SyncCoordinator};

/// Serve the sync control API.
pub fn run(
    listener: TcpListener,
    coordinator: Arc<SyncCoordinator>,
    scheduler: Arc<AutoSyncScheduler>,
) -> Result<Server, std::io::Error> {
    let coordinator = web::Data::new(coordinator);
    let scheduler = web::Data::new(scheduler);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(coordinator.clone())
            .app_data(scheduler.clone())
            .configure(init_routes)
    })
    .listen(listener)?
    .run();

    Ok(server)
}
