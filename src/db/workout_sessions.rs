use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::{StoreError, WorkoutStore};
use crate::models::{HeartRateReading, WorkoutCategory, WorkoutSession};

const SELECT_COLUMNS: &str = r#"
    SELECT id, category, start_time, end_time, duration_seconds, is_active,
           heart_rate_readings, avg_heart_rate, max_heart_rate, calories,
           step_count, exercise_count, notes
    FROM workout_sessions
"#;

/// Postgres-backed canonical store. Writes go into one open transaction
/// that `save` commits.
pub struct PgWorkoutStore {
    pool: PgPool,
    transaction: Mutex<Option<Transaction<'static, Postgres>>>,
}

impl PgWorkoutStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            transaction: Mutex::new(None),
        }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn session_from_row(row: &PgRow) -> Result<WorkoutSession, StoreError> {
    let category: String = row.try_get("category")?;
    let category = category.parse::<WorkoutCategory>().map_err(StoreError::Corrupt)?;
    let readings: Json<Vec<HeartRateReading>> = row.try_get("heart_rate_readings")?;
    let start_time: DateTime<Utc> = row.try_get("start_time")?;

    Ok(WorkoutSession {
        id: row.try_get("id")?,
        category,
        start_time,
        end_time: row.try_get("end_time")?,
        duration_seconds: row.try_get("duration_seconds")?,
        is_active: row.try_get("is_active")?,
        heart_rate_readings: readings.0,
        avg_heart_rate: row.try_get("avg_heart_rate")?,
        max_heart_rate: row.try_get("max_heart_rate")?,
        calories: row.try_get("calories")?,
        step_count: row.try_get("step_count")?,
        exercise_count: row.try_get("exercise_count")?,
        notes: row.try_get("notes")?,
    })
}

fn map_insert_error(e: sqlx::Error, session_id: Uuid) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        // PostgreSQL unique constraint violation
        if db_err.code().as_deref() == Some("23505") {
            tracing::error!(
                "Duplicate workout session id {}: constraint={}",
                session_id,
                db_err.constraint().unwrap_or("unknown")
            );
            return StoreError::Duplicate(session_id);
        }
        tracing::error!(
            "Database error inserting workout session: code={:?}, message={}",
            db_err.code(),
            db_err.message()
        );
    }
    StoreError::Database(e)
}

/// A failed statement aborts the Postgres transaction, so every staged write
/// in it is lost. Drop it so the next call starts clean.
async fn discard_transaction(transaction: &mut Option<Transaction<'static, Postgres>>) {
    if let Some(tx) = transaction.take() {
        match tx.rollback().await {
            Ok(()) => tracing::warn!("Rolled back workout session transaction after a failed write"),
            Err(e) => tracing::error!("Failed to roll back workout session transaction: {}", e),
        }
    }
}

#[async_trait]
impl WorkoutStore for PgWorkoutStore {
    #[tracing::instrument(name = "Fetch workout session by id", skip(self), fields(session_id = %id))]
    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<WorkoutSession>, StoreError> {
        let sql = format!("{} WHERE id = $1", SELECT_COLUMNS);
        let query = sqlx::query(&sql).bind(id);

        let mut guard = self.transaction.lock().await;
        let row = match guard.as_mut() {
            Some(tx) => match query.fetch_optional(&mut **tx).await {
                Ok(row) => row,
                Err(e) => {
                    discard_transaction(&mut guard).await;
                    return Err(StoreError::Database(e));
                }
            },
            None => query.fetch_optional(&self.pool).await?,
        };

        row.as_ref().map(session_from_row).transpose()
    }

    #[tracing::instrument(name = "Fetch all workout sessions", skip(self))]
    async fn fetch_all(&self) -> Result<Vec<WorkoutSession>, StoreError> {
        let sql = format!("{} ORDER BY start_time", SELECT_COLUMNS);
        let query = sqlx::query(&sql);

        let mut guard = self.transaction.lock().await;
        let rows = match guard.as_mut() {
            Some(tx) => match query.fetch_all(&mut **tx).await {
                Ok(rows) => rows,
                Err(e) => {
                    discard_transaction(&mut guard).await;
                    return Err(StoreError::Database(e));
                }
            },
            None => query.fetch_all(&self.pool).await?,
        };

        tracing::debug!("Loaded {} workout sessions", rows.len());
        rows.iter().map(session_from_row).collect()
    }

    #[tracing::instrument(name = "Insert workout session", skip(self, session), fields(session_id = %session.id))]
    async fn insert(&self, session: &WorkoutSession) -> Result<(), StoreError> {
        let mut guard = self.transaction.lock().await;
        if guard.is_none() {
            *guard = Some(self.pool.begin().await?);
        }
        let tx = guard
            .as_mut()
            .ok_or_else(|| StoreError::Unavailable("transaction not open".to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO workout_sessions (
                id, category, start_time, end_time, duration_seconds, is_active,
                heart_rate_readings, avg_heart_rate, max_heart_rate, calories,
                step_count, exercise_count, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(session.id)
        .bind(session.category.as_str())
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.duration_seconds)
        .bind(session.is_active)
        .bind(Json(&session.heart_rate_readings))
        .bind(session.avg_heart_rate)
        .bind(session.max_heart_rate)
        .bind(session.calories)
        .bind(session.step_count)
        .bind(session.exercise_count)
        .bind(&session.notes)
        .execute(&mut **tx)
        .await;

        if let Err(e) = result {
            discard_transaction(&mut guard).await;
            return Err(map_insert_error(e, session.id));
        }

        tracing::info!("Staged insert of workout session {}", session.id);
        Ok(())
    }

    #[tracing::instrument(name = "Update workout session", skip(self, session), fields(session_id = %session.id))]
    async fn update(&self, session: &WorkoutSession) -> Result<(), StoreError> {
        let mut guard = self.transaction.lock().await;
        if guard.is_none() {
            *guard = Some(self.pool.begin().await?);
        }
        let tx = guard
            .as_mut()
            .ok_or_else(|| StoreError::Unavailable("transaction not open".to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE workout_sessions
            SET end_time = $2,
                duration_seconds = $3,
                is_active = $4,
                heart_rate_readings = $5,
                avg_heart_rate = $6,
                max_heart_rate = $7,
                calories = $8,
                step_count = $9,
                exercise_count = $10,
                notes = $11,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(session.id)
        .bind(session.end_time)
        .bind(session.duration_seconds)
        .bind(session.is_active)
        .bind(Json(&session.heart_rate_readings))
        .bind(session.avg_heart_rate)
        .bind(session.max_heart_rate)
        .bind(session.calories)
        .bind(session.step_count)
        .bind(session.exercise_count)
        .bind(&session.notes)
        .execute(&mut **tx)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                discard_transaction(&mut guard).await;
                return Err(StoreError::Database(e));
            }
        };
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(session.id));
        }
        Ok(())
    }

    #[tracing::instrument(name = "Commit workout sessions", skip(self))]
    async fn save(&self) -> Result<(), StoreError> {
        let mut guard = self.transaction.lock().await;
        if let Some(tx) = guard.take() {
            tx.commit().await?;
            tracing::debug!("Committed staged workout session writes");
        }
        Ok(())
    }
}
