//! Postgres-backed store. Needs the database from `configuration/base.yml`:
//! `cargo test -- --ignored`.

mod common;
use common::utils::spawn_pg_store;
use common::workout_helpers::finished_session;

use wearable_sync::db::{StoreError, WorkoutStore};
use wearable_sync::models::WorkoutCategory;

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_staged_writes_are_visible_and_committed_on_save() {
    let store = spawn_pg_store().await;
    let session = finished_session(WorkoutCategory::Strength, 320).with_notes("Deadlifts");

    store.insert(&session).await.expect("insert failed");
    let staged = store.fetch_by_id(session.id).await.unwrap().expect("staged insert not visible");
    assert_eq!(staged.calories, 320);
    assert_eq!(staged.category, WorkoutCategory::Strength);
    store.save().await.expect("save failed");

    let all = store.fetch_all().await.expect("fetch failed");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].heart_rate_readings, session.heart_rate_readings);
    assert_eq!(all[0].notes.as_deref(), Some("Deadlifts"));
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_store_recovers_after_failed_write() {
    let store = spawn_pg_store().await;
    let saved = finished_session(WorkoutCategory::Cardio, 410);
    store.insert(&saved).await.unwrap();
    store.save().await.unwrap();

    // Unique violation aborts the open transaction
    let error = store.insert(&saved).await.expect_err("duplicate insert succeeded");
    assert!(matches!(error, StoreError::Duplicate(id) if id == saved.id));

    let all = store.fetch_all().await.expect("store stuck after failed write");
    assert_eq!(all.len(), 1);

    let next = finished_session(WorkoutCategory::Other, 120);
    store.insert(&next).await.expect("insert after failure failed");
    store.save().await.expect("save after failure failed");
    assert!(store.fetch_by_id(next.id).await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn test_update_of_missing_session_is_not_found() {
    let store = spawn_pg_store().await;
    let ghost = finished_session(WorkoutCategory::Cardio, 200);

    let error = store.update(&ghost).await.expect_err("update of missing row succeeded");
    assert!(matches!(error, StoreError::NotFound(id) if id == ghost.id));
    store.save().await.expect("save failed");
}
