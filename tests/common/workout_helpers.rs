use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use wearable_sync::db::{InMemoryWorkoutStore, StoreError, WorkoutStore};
use wearable_sync::models::{HealthSnapshot, HeartRateReading, WorkoutCategory, WorkoutSession};

/// A finished session that started an hour ago and ran 45 minutes.
pub fn finished_session(category: WorkoutCategory, calories: i32) -> WorkoutSession {
    let start = Utc::now() - Duration::hours(1);
    let mut session = WorkoutSession::start(category, start).with_calories(calories);
    for (minute, bpm) in [(5, 118), (15, 142), (30, 155)] {
        session.append_reading(HeartRateReading::new(bpm, start + Duration::minutes(minute)));
    }
    session.exercise_count = 6;
    session.finish(start + Duration::minutes(45));
    session
}

pub fn sample_snapshot() -> HealthSnapshot {
    HealthSnapshot {
        heart_rate: 72,
        step_count: 8_432,
        calories: 1_650,
        captured_at: Utc::now(),
    }
}

/// Store that refuses to write one specific session.
pub struct FailingStore {
    pub inner: InMemoryWorkoutStore,
    pub fail_on: Uuid,
}

#[async_trait]
impl WorkoutStore for FailingStore {
    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<WorkoutSession>, StoreError> {
        self.inner.fetch_by_id(id).await
    }

    async fn fetch_all(&self) -> Result<Vec<WorkoutSession>, StoreError> {
        self.inner.fetch_all().await
    }

    async fn insert(&self, session: &WorkoutSession) -> Result<(), StoreError> {
        if session.id == self.fail_on {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.inner.insert(session).await
    }

    async fn update(&self, session: &WorkoutSession) -> Result<(), StoreError> {
        if session.id == self.fail_on {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.inner.update(session).await
    }

    async fn save(&self) -> Result<(), StoreError> {
        self.inner.save().await
    }
}
