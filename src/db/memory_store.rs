use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{StoreError, WorkoutStore};
use crate::models::WorkoutSession;

#[derive(Default)]
struct StoreState {
    committed: HashMap<Uuid, WorkoutSession>,
    staged: HashMap<Uuid, WorkoutSession>,
    saves: usize,
}

impl StoreState {
    fn contains(&self, id: &Uuid) -> bool {
        self.staged.contains_key(id) || self.committed.contains_key(id)
    }
}

/// In-process canonical store, used for local runs and tests.
#[derive(Default)]
pub struct InMemoryWorkoutStore {
    state: RwLock<StoreState>,
}

impl InMemoryWorkoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: Vec<WorkoutSession>) -> Self {
        let committed = sessions.into_iter().map(|s| (s.id, s)).collect();
        Self {
            state: RwLock::new(StoreState {
                committed,
                ..StoreState::default()
            }),
        }
    }

    /// Committed sessions only.
    pub async fn committed(&self) -> Vec<WorkoutSession> {
        let state = self.state.read().await;
        let mut sessions: Vec<WorkoutSession> = state.committed.values().cloned().collect();
        sessions.sort_by_key(|s| s.start_time);
        sessions
    }

    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state
            .staged
            .keys()
            .filter(|id| !state.committed.contains_key(id))
            .count()
            + state.committed.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn save_count(&self) -> usize {
        self.state.read().await.saves
    }
}

#[async_trait]
impl WorkoutStore for InMemoryWorkoutStore {
    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<WorkoutSession>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .staged
            .get(&id)
            .or_else(|| state.committed.get(&id))
            .cloned())
    }

    async fn fetch_all(&self) -> Result<Vec<WorkoutSession>, StoreError> {
        let state = self.state.read().await;
        let mut merged = state.committed.clone();
        merged.extend(state.staged.iter().map(|(id, s)| (*id, s.clone())));
        let mut sessions: Vec<WorkoutSession> = merged.into_values().collect();
        sessions.sort_by_key(|s| s.start_time);
        Ok(sessions)
    }

    async fn insert(&self, session: &WorkoutSession) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.contains(&session.id) {
            return Err(StoreError::Duplicate(session.id));
        }
        state.staged.insert(session.id, session.clone());
        Ok(())
    }

    async fn update(&self, session: &WorkoutSession) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.contains(&session.id) {
            return Err(StoreError::NotFound(session.id));
        }
        state.staged.insert(session.id, session.clone());
        Ok(())
    }

    async fn save(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let staged: Vec<(Uuid, WorkoutSession)> = state.staged.drain().collect();
        state.committed.extend(staged);
        state.saves += 1;
        Ok(())
    }
}
