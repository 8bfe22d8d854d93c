use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Instantaneous health reading pulled from the wearable. Broadcast only, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub heart_rate: i32,
    pub step_count: i32,
    pub calories: i32,
    pub captured_at: DateTime<Utc>,
}
