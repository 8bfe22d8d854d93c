use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;

use wearable_sync::config::settings::{get_config, DeviceTransport, StoreBackend};
use wearable_sync::db::{InMemoryWorkoutStore, PgWorkoutStore, WorkoutStore};
use wearable_sync::run;
use wearable_sync::services::{
    AutoSyncScheduler, NotificationBus, RedisHealthRelay, StaticProfileProvider, SyncCoordinator,
    UserProfile,
};
use wearable_sync::telemetry::{get_subscriber, init_subscriber};
use wearable_sync::transport::{DeviceChannel, HttpDeviceChannel, ScriptedDeviceChannel};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Panic if we can't read the config
    let config = get_config().expect("Failed to read the config.");

    let subscriber = get_subscriber(
        "wearable-sync".into(),
        config.application.log_level.clone(),
        std::io::stdout,
    );
    init_subscriber(subscriber);

    let store: Arc<dyn WorkoutStore> = match config.application.store_backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory workout store");
            Arc::new(InMemoryWorkoutStore::new())
        }
        StoreBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(8)
                .acquire_timeout(Duration::from_secs(10))
                .connect_lazy(config.database.connection_string().expose_secret())
                .expect("Failed to create Postgres connection pool");
            let store = PgWorkoutStore::new(pool);
            store.migrate().await.expect("Failed to run database migrations");
            tracing::info!("Using Postgres workout store");
            Arc::new(store)
        }
    };

    let channel: Arc<dyn DeviceChannel> = match config.device.transport {
        DeviceTransport::Http => Arc::new(HttpDeviceChannel::from_settings(&config.device)),
        DeviceTransport::Scripted => {
            tracing::warn!("Using scripted device channel, no wearable will be contacted");
            Arc::new(ScriptedDeviceChannel::new())
        }
    };

    let profile = Arc::new(StaticProfileProvider::new(UserProfile::from(&config.profile)));
    let bus = NotificationBus::new(config.sync.bus_capacity);

    if let Some(redis_settings) = &config.redis {
        match redis::Client::open(redis_settings.get_redis_url().expose_secret()) {
            Ok(client) => {
                tracing::info!("Redis client created, relaying health snapshots");
                RedisHealthRelay::new(Arc::new(client), redis_settings.health_channel.clone())
                    .spawn(&bus);
            }
            Err(e) => {
                tracing::error!("Failed to create Redis client: {}. Health snapshots will not be relayed.", e);
            }
        }
    }

    let coordinator = Arc::new(
        SyncCoordinator::new(channel, store, profile, bus)
            .with_phase_timeout(Duration::from_secs(config.sync.phase_timeout_secs)),
    );

    let scheduler = match AutoSyncScheduler::new(coordinator.clone()).await {
        Ok(scheduler) => scheduler,
        Err(e) => {
            tracing::error!("❌ Failed to create auto-sync scheduler: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = scheduler.start().await {
        tracing::error!("❌ Failed to start auto-sync scheduler: {}", e);
        std::process::exit(1);
    }
    match config.sync.auto_sync_interval() {
        Some(interval) => {
            if let Err(e) = scheduler.schedule(interval).await {
                tracing::error!("❌ Failed to arm auto-sync: {}", e);
            }
        }
        None if config.sync.auto_sync_enabled => {
            tracing::warn!("Auto-sync enabled with a zero interval, leaving it disarmed");
        }
        None => {}
    }

    let address = format!("{}:{}", config.application.host, config.application.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Sync control API listening on {}", address);

    run(listener, coordinator, Arc::new(scheduler))?.await
}
