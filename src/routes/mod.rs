use actix_web::web;

pub mod backend_health;
pub mod device;
pub mod sync;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(backend_health::backend_health);

    cfg.service(
        web::scope("/sync")
            .service(sync::run_sync_cycle)
            .service(sync::sync_status)
            .service(sync::auto_sync),
    );
    cfg.service(
        web::scope("/device")
            .service(device::device_command)
            .service(device::device_health),
    );
}
