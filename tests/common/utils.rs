use std::net::TcpListener;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use once_cell::sync::Lazy;
use secrecy::ExposeSecret;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

use wearable_sync::config::settings::{get_config, DatabaseSettings};
use wearable_sync::db::{InMemoryWorkoutStore, PgWorkoutStore};
use wearable_sync::models::SyncStatus;
use wearable_sync::run;
use wearable_sync::services::{AutoSyncScheduler, NotificationBus, StaticProfileProvider, SyncCoordinator};
use wearable_sync::telemetry::{get_subscriber, init_subscriber};
use wearable_sync::transport::ScriptedDeviceChannel;

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub fn init_tracing() {
    Lazy::force(&TRACING);
}

pub struct TestSync {
    pub coordinator: Arc<SyncCoordinator>,
    pub channel: Arc<ScriptedDeviceChannel>,
    pub store: Arc<InMemoryWorkoutStore>,
    pub profile: Arc<StaticProfileProvider>,
    pub bus: NotificationBus,
}

pub fn build_sync(channel: ScriptedDeviceChannel, store: InMemoryWorkoutStore) -> TestSync {
    init_tracing();

    let channel = Arc::new(channel);
    let store = Arc::new(store);
    let profile = Arc::new(StaticProfileProvider::default());
    let bus = NotificationBus::new(64);
    let coordinator = Arc::new(SyncCoordinator::new(
        channel.clone(),
        store.clone(),
        profile.clone(),
        bus.clone(),
    ));

    TestSync {
        coordinator,
        channel,
        store,
        profile,
        bus,
    }
}

pub struct TestApp {
    pub address: String,
    pub sync: TestSync,
    pub scheduler: Arc<AutoSyncScheduler>,
}

pub async fn spawn_app(channel: ScriptedDeviceChannel) -> TestApp {
    let sync = build_sync(channel, InMemoryWorkoutStore::new());

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    // Get port assigned by the OS
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let scheduler = AutoSyncScheduler::new(sync.coordinator.clone())
        .await
        .expect("Failed to create scheduler");
    scheduler.start().await.expect("Failed to start scheduler");
    let scheduler = Arc::new(scheduler);

    let server = run(listener, sync.coordinator.clone(), scheduler.clone()).expect("Failed to bind address");
    // Launch the server as a background task
    let _ = tokio::spawn(server);

    TestApp {
        address,
        sync,
        scheduler,
    }
}

/// Everything already buffered on a progress stream, without waiting.
pub fn drain_ready(stream: &mut BoxStream<'static, SyncStatus>) -> Vec<SyncStatus> {
    let mut collected = Vec::new();
    while let Some(Some(status)) = stream.next().now_or_never() {
        collected.push(status);
    }
    collected
}

pub async fn configure_db(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect(config.connection_string_without_db().expose_secret())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.db_name).as_str())
        .await
        .expect("Failed to create database.");

    let connection_pool = PgPool::connect(config.connection_string().expose_secret())
        .await
        .expect("Failed to connect to Postgres.");
    connection_pool
}

/// A migrated Postgres store on a fresh, randomly named database.
pub async fn spawn_pg_store() -> PgWorkoutStore {
    init_tracing();

    let mut config = get_config().expect("Failed to read configuration.");
    config.database.db_name = Uuid::new_v4().to_string();
    config.database.db_url = None;

    let store = PgWorkoutStore::new(configure_db(&config.database).await);
    store.migrate().await.expect("Failed to migrate the database");
    store
}
