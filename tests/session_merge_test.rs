// Merge of device sessions into the canonical store

use chrono::{Duration, Utc};
use uuid::Uuid;

mod common;
use common::workout_helpers::finished_session;

use wearable_sync::db::{InMemoryWorkoutStore, WorkoutStore};
use wearable_sync::models::{HeartRateReading, WorkoutCategory, WorkoutSession};
use wearable_sync::workout::{merge_session, MergeOutcome};

#[tokio::test]
async fn test_absent_session_is_inserted_verbatim() {
    let store = InMemoryWorkoutStore::new();
    let incoming = finished_session(WorkoutCategory::Cardio, 410);

    let outcome = merge_session(&store, &incoming).await.expect("merge failed");

    assert_eq!(outcome, MergeOutcome::Inserted);
    assert_eq!(store.len().await, 1);
    let stored = store.fetch_by_id(incoming.id).await.unwrap().expect("session missing");
    assert_eq!(stored, incoming);
    assert_eq!(store.committed().await, vec![incoming]);
}

#[tokio::test]
async fn test_device_update_scenario() {
    let u1 = Uuid::new_v4();
    let canonical = WorkoutSession::start(WorkoutCategory::Strength, Utc::now() - Duration::hours(2))
        .with_id(u1)
        .with_calories(200);
    let store = InMemoryWorkoutStore::with_sessions(vec![canonical.clone()]);

    let incoming = canonical
        .clone()
        .with_calories(300)
        .with_notes("Updated from device.");
    let outcome = merge_session(&store, &incoming).await.expect("merge failed");

    assert_eq!(outcome, MergeOutcome::Updated);
    let stored = store.fetch_by_id(u1).await.unwrap().expect("session missing");
    assert_eq!(stored.calories, 300);
    assert!(stored.notes.as_deref().unwrap_or_default().contains("Updated from device."));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_numeric_fields_are_set_not_incremented() {
    let existing = finished_session(WorkoutCategory::Cardio, 250).with_notes("Morning run");
    let store = InMemoryWorkoutStore::with_sessions(vec![existing.clone()]);

    let mut incoming = existing.clone().with_calories(320).with_notes("Tempo section");
    incoming.step_count = Some(6_100);
    incoming.exercise_count = 9;

    merge_session(&store, &incoming).await.expect("merge failed");

    let stored = store.fetch_by_id(existing.id).await.unwrap().unwrap();
    assert_eq!(stored.calories, 320);
    assert_eq!(stored.step_count, Some(6_100));
    assert_eq!(stored.exercise_count, 9);
    assert_eq!(stored.notes.as_deref(), Some("Morning run\nTempo section"));
}

#[tokio::test]
async fn test_merging_twice_equals_merging_once() {
    let existing = finished_session(WorkoutCategory::IntervalWorkout, 180).with_notes("Warm-up only");
    let store = InMemoryWorkoutStore::with_sessions(vec![existing.clone()]);
    let incoming = existing.clone().with_calories(390).with_notes("Finished all rounds");

    let first = merge_session(&store, &incoming).await.expect("first merge failed");
    let after_once = store.fetch_by_id(existing.id).await.unwrap();

    let second = merge_session(&store, &incoming).await.expect("second merge failed");
    let after_twice = store.fetch_by_id(existing.id).await.unwrap();

    assert_eq!(first, MergeOutcome::Updated);
    assert_eq!(second, MergeOutcome::Unchanged);
    assert_eq!(after_once, after_twice);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_open_canonical_record_takes_device_bounds() {
    let start = Utc::now() - Duration::minutes(50);
    let open = WorkoutSession::start(WorkoutCategory::Cardio, start);
    let store = InMemoryWorkoutStore::with_sessions(vec![open.clone()]);

    let mut finished = open.clone().with_calories(275);
    for (minute, bpm) in [(1, 120), (2, 150), (3, 135)] {
        finished.append_reading(HeartRateReading::new(bpm, start + Duration::minutes(minute)));
    }
    finished.finish(start + Duration::minutes(40));

    merge_session(&store, &finished).await.expect("merge failed");

    let stored = store.fetch_by_id(open.id).await.unwrap().unwrap();
    assert!(!stored.is_active);
    assert_eq!(stored.end_time, Some(start + Duration::minutes(40)));
    assert_eq!(stored.duration_seconds, 40 * 60);
    assert_eq!(stored.avg_heart_rate, Some(135.0));
    assert_eq!(stored.max_heart_rate, Some(150));
}

#[tokio::test]
async fn test_finalized_canonical_record_keeps_its_bounds() {
    let existing = finished_session(WorkoutCategory::Strength, 300);
    let store = InMemoryWorkoutStore::with_sessions(vec![existing.clone()]);

    let mut incoming = existing.clone();
    incoming.end_time = existing.end_time.map(|end| end + Duration::minutes(10));
    incoming.duration_seconds += 600;

    merge_session(&store, &incoming).await.expect("merge failed");

    let stored = store.fetch_by_id(existing.id).await.unwrap().unwrap();
    assert_eq!(stored.end_time, existing.end_time);
    assert_eq!(stored.duration_seconds, existing.duration_seconds);
}

#[tokio::test]
async fn test_merges_never_delete_other_records() {
    let untouched = finished_session(WorkoutCategory::Other, 90);
    let target = finished_session(WorkoutCategory::Cardio, 200);
    let store = InMemoryWorkoutStore::with_sessions(vec![untouched.clone(), target.clone()]);

    for calories in [210, 220, 230] {
        merge_session(&store, &target.clone().with_calories(calories))
            .await
            .expect("merge failed");
    }

    assert_eq!(store.len().await, 2);
    assert_eq!(store.fetch_by_id(untouched.id).await.unwrap(), Some(untouched));
    assert_eq!(store.fetch_by_id(target.id).await.unwrap().unwrap().calories, 230);
}

#[tokio::test]
async fn test_duration_follows_canonical_start_when_device_start_differs() {
    let start = Utc::now() - Duration::hours(1);
    let open = WorkoutSession::start(WorkoutCategory::Strength, start);
    let store = InMemoryWorkoutStore::with_sessions(vec![open.clone()]);

    // The watch noticed the workout a minute late
    let mut incoming = WorkoutSession::start(WorkoutCategory::Strength, start + Duration::seconds(60))
        .with_id(open.id);
    incoming.finish(start + Duration::seconds(660));
    assert_eq!(incoming.duration_seconds, 600);

    merge_session(&store, &incoming).await.expect("merge failed");

    let stored = store.fetch_by_id(open.id).await.unwrap().unwrap();
    assert!(!stored.is_active);
    assert_eq!(stored.start_time, start);
    assert_eq!(stored.end_time, Some(start + Duration::seconds(660)));
    assert_eq!(stored.duration_seconds, 660);
    assert_eq!(
        stored.duration_seconds,
        (stored.end_time.unwrap() - stored.start_time).num_seconds()
    );
}

#[tokio::test]
async fn test_device_copy_with_fewer_readings_keeps_stored_readings() {
    let start = Utc::now() - Duration::hours(1);
    let mut existing = WorkoutSession::start(WorkoutCategory::Cardio, start);
    for (minute, bpm) in [(1, 120), (2, 150), (3, 135)] {
        existing.append_reading(HeartRateReading::new(bpm, start + Duration::minutes(minute)));
    }
    existing.finish(start + Duration::minutes(30));
    let store = InMemoryWorkoutStore::with_sessions(vec![existing.clone()]);

    // One reading the primary already has, plus one it never saw
    let mut incoming = existing.clone();
    incoming.heart_rate_readings = vec![
        HeartRateReading::new(150, start + Duration::minutes(2)),
        HeartRateReading::new(160, start + Duration::seconds(150)),
    ];

    let first = merge_session(&store, &incoming).await.expect("merge failed");
    let second = merge_session(&store, &incoming).await.expect("merge failed");

    let stored = store.fetch_by_id(existing.id).await.unwrap().unwrap();
    let bpms: Vec<i32> = stored.heart_rate_readings.iter().map(|r| r.bpm).collect();
    assert_eq!(bpms, vec![120, 150, 160, 135]);
    assert_eq!(stored.avg_heart_rate, Some(141.25));
    assert_eq!(stored.max_heart_rate, Some(160));
    assert_eq!(first, MergeOutcome::Updated);
    assert_eq!(second, MergeOutcome::Unchanged);
}

#[tokio::test]
async fn test_device_copy_without_readings_keeps_stored_readings() {
    let existing = finished_session(WorkoutCategory::IntervalWorkout, 300);
    let store = InMemoryWorkoutStore::with_sessions(vec![existing.clone()]);

    let mut incoming = existing.clone().with_calories(310);
    incoming.heart_rate_readings.clear();

    merge_session(&store, &incoming).await.expect("merge failed");

    let stored = store.fetch_by_id(existing.id).await.unwrap().unwrap();
    assert_eq!(stored.heart_rate_readings, existing.heart_rate_readings);
    assert_eq!(stored.avg_heart_rate, existing.avg_heart_rate);
    assert_eq!(stored.calories, 310);
}
