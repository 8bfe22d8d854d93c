use serde::Serialize;

use crate::db::{StoreError, WorkoutStore};
use crate::models::WorkoutSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Reconcile one session received from the wearable with the canonical store.
///
/// Absolute values only, so applying the same record twice leaves the store
/// exactly as applying it once.
#[tracing::instrument(
    name = "Merge incoming workout session",
    skip(store, incoming),
    fields(session_id = %incoming.id)
)]
pub async fn merge_session(
    store: &dyn WorkoutStore,
    incoming: &WorkoutSession,
) -> Result<MergeOutcome, StoreError> {
    let existing = match store.fetch_by_id(incoming.id).await? {
        Some(existing) => existing,
        None => {
            store.insert(incoming).await?;
            store.save().await?;
            tracing::info!("📥 Inserted new workout session {} from device", incoming.id);
            return Ok(MergeOutcome::Inserted);
        }
    };

    let merged = merge_session_fields(&existing, incoming);
    if merged == existing {
        tracing::debug!("Workout session {} already up to date", incoming.id);
        return Ok(MergeOutcome::Unchanged);
    }

    store.update(&merged).await?;
    store.save().await?;
    tracing::info!(
        "🔄 Merged workout session {}: calories {} -> {}",
        incoming.id,
        existing.calories,
        merged.calories
    );
    Ok(MergeOutcome::Updated)
}

/// Device-authoritative fields overwrite, identity fields stay.
pub fn merge_session_fields(existing: &WorkoutSession, incoming: &WorkoutSession) -> WorkoutSession {
    let mut merged = existing.clone();

    merged.calories = incoming.calories;
    merged.exercise_count = incoming.exercise_count;
    if incoming.step_count.is_some() {
        merged.step_count = incoming.step_count;
    }

    // A finalized canonical record keeps its bounds. Duration is measured
    // from the canonical start, whatever the device thinks it was.
    if existing.is_active {
        match incoming.end_time {
            Some(end_time) if !incoming.is_active => merged.finish(end_time),
            _ => {
                merged.end_time = incoming.end_time;
                merged.duration_seconds = incoming.duration_seconds;
                merged.is_active = incoming.is_active;
            }
        }
    }

    // Readings are append-only: union by (timestamp, bpm).
    for reading in &incoming.heart_rate_readings {
        if !merged.heart_rate_readings.contains(reading) {
            merged.append_reading(reading.clone());
        }
    }
    if merged.heart_rate_readings.is_empty()
        && (incoming.avg_heart_rate.is_some() || incoming.max_heart_rate.is_some())
    {
        merged.avg_heart_rate = incoming.avg_heart_rate;
        merged.max_heart_rate = incoming.max_heart_rate;
    }

    merged.notes = merge_notes(existing.notes.as_deref(), incoming.notes.as_deref());
    merged
}

/// Append incoming notes to existing ones unless every incoming line is
/// already one of the existing lines.
pub fn merge_notes(existing: Option<&str>, incoming: Option<&str>) -> Option<String> {
    let incoming = match incoming.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => return existing.map(str::to_string),
    };

    match existing {
        Some(current) if !current.trim().is_empty() => {
            let already_noted = incoming
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .all(|line| current.lines().any(|existing_line| existing_line.trim() == line));
            if already_noted {
                Some(current.to_string())
            } else {
                Some(format!("{}\n{}", current, incoming))
            }
        }
        _ => Some(incoming.to_string()),
    }
}
