use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::workout_session::WorkoutCategory;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMetrics {
    pub show_heart_rate: bool,
    pub show_calories: bool,
    pub show_duration: bool,
    pub show_steps: bool,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self {
            show_heart_rate: true,
            show_calories: true,
            show_duration: true,
            show_steps: false,
        }
    }
}

/// Preferences pushed to the wearable. Never pulled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSyncSettings {
    pub preferred_categories: BTreeSet<WorkoutCategory>,
    pub haptic_feedback: bool,
    pub auto_start: bool,
    pub display_metrics: DisplayMetrics,
}

impl Default for UserSyncSettings {
    fn default() -> Self {
        Self {
            preferred_categories: BTreeSet::new(),
            haptic_feedback: true,
            auto_start: false,
            display_metrics: DisplayMetrics::default(),
        }
    }
}
