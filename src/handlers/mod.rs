pub mod backend_health_handler;
pub mod device_handler;
pub mod sync_handler;
