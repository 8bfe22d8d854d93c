use std::time::Duration;

use futures::{FutureExt, StreamExt};

mod common;
use common::utils::{drain_ready, init_tracing};
use common::workout_helpers::sample_snapshot;

use wearable_sync::models::{SyncState, SyncStatus};
use wearable_sync::services::notification_bus::{BusEvent, SYNC_PROGRESS_TOPIC};
use wearable_sync::services::NotificationBus;

fn status_at(progress: f64) -> SyncStatus {
    SyncStatus {
        state: SyncState::Syncing,
        progress,
        ..SyncStatus::default()
    }
}

#[tokio::test]
async fn test_every_subscriber_receives_the_event() {
    init_tracing();
    let bus = NotificationBus::default();
    let mut phone = bus.subscribe_health_snapshots();
    let mut dashboard = bus.subscribe_health_snapshots();
    let snapshot = sample_snapshot();

    let delivered = bus.publish_health_snapshot(&snapshot);

    assert_eq!(delivered, 2);
    assert_eq!(phone.next().await, Some(snapshot.clone()));
    assert_eq!(dashboard.next().await, Some(snapshot));
}

#[tokio::test]
async fn test_event_without_subscribers_is_dropped() {
    init_tracing();
    let bus = NotificationBus::default();

    assert_eq!(bus.publish_sync_status(&status_at(0.1)), 0);

    // A late subscriber does not see earlier events
    let mut late = bus.subscribe_sync_progress();
    assert!(drain_ready(&mut late).is_empty());
}

#[tokio::test]
async fn test_topics_are_isolated() {
    init_tracing();
    let bus = NotificationBus::default();
    let mut snapshots = bus.subscribe_health_snapshots();
    let mut progress = bus.subscribe_sync_progress();

    bus.publish_sync_status(&status_at(0.3));

    assert!(snapshots.next().now_or_never().is_none());
    let received = tokio::time::timeout(Duration::from_secs(1), progress.next())
        .await
        .expect("no progress event");
    assert_eq!(received.map(|s| s.progress), Some(0.3));
}

#[tokio::test]
async fn test_lagging_subscriber_skips_missed_events() {
    init_tracing();
    let bus = NotificationBus::new(2);
    let mut progress = bus.subscribe_sync_progress();

    for step in 1..=5 {
        bus.publish_sync_status(&status_at(step as f64 / 10.0));
    }

    let received: Vec<f64> = drain_ready(&mut progress).iter().map(|s| s.progress).collect();
    assert_eq!(received, vec![0.4, 0.5]);
}

#[tokio::test]
async fn test_raw_topic_subscription_sees_tagged_events() {
    init_tracing();
    let bus = NotificationBus::default();
    let mut raw = bus.subscribe(SYNC_PROGRESS_TOPIC);

    bus.publish_sync_status(&status_at(0.8));

    match raw.next().await {
        Some(BusEvent::SyncStatus(status)) => assert_eq!(status.progress, 0.8),
        other => panic!("unexpected event {:?}", other),
    }
}
