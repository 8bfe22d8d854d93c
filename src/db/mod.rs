//! Canonical store of workout sessions.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::WorkoutSession;

pub mod memory_store;
pub mod workout_sessions;

pub use memory_store::InMemoryWorkoutStore;
pub use workout_sessions::PgWorkoutStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Workout session {0} not found")]
    NotFound(Uuid),

    #[error("Workout session {0} already exists")]
    Duplicate(Uuid),

    #[error("Corrupt workout session row: {0}")]
    Corrupt(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Minimal shape the sync engine needs from the canonical store.
///
/// Writes are staged until `save`. Reads see staged writes.
#[async_trait]
pub trait WorkoutStore: Send + Sync {
    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<WorkoutSession>, StoreError>;

    async fn fetch_all(&self) -> Result<Vec<WorkoutSession>, StoreError>;

    async fn insert(&self, session: &WorkoutSession) -> Result<(), StoreError>;

    async fn update(&self, session: &WorkoutSession) -> Result<(), StoreError>;

    async fn save(&self) -> Result<(), StoreError>;
}
