use std::collections::BTreeSet;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::config::settings::ProfileSettings;
use crate::models::{DisplayMetrics, UserSyncSettings, WorkoutCategory};

/// What the primary device knows about the user that the wearable needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub preferred_categories: Vec<WorkoutCategory>,
    pub haptic_feedback: bool,
    pub auto_start: bool,
    pub display_metrics: DisplayMetrics,
}

impl UserProfile {
    pub fn to_sync_settings(&self) -> UserSyncSettings {
        UserSyncSettings {
            preferred_categories: self.preferred_categories.iter().copied().collect::<BTreeSet<_>>(),
            haptic_feedback: self.haptic_feedback,
            auto_start: self.auto_start,
            display_metrics: self.display_metrics.clone(),
        }
    }
}

impl From<&ProfileSettings> for UserProfile {
    fn from(settings: &ProfileSettings) -> Self {
        Self {
            preferred_categories: settings.preferred_categories.clone(),
            haptic_feedback: settings.haptic_feedback,
            auto_start: settings.auto_start,
            display_metrics: settings.display_metrics.clone(),
        }
    }
}

/// Read-only source of the user's profile.
pub trait UserProfileProvider: Send + Sync {
    fn current_profile(&self) -> UserProfile;
}

/// Profile held in memory, seeded from configuration.
pub struct StaticProfileProvider {
    profile: RwLock<UserProfile>,
}

impl StaticProfileProvider {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile: RwLock::new(profile),
        }
    }

    pub fn replace(&self, profile: UserProfile) {
        match self.profile.write() {
            Ok(mut current) => *current = profile,
            Err(poisoned) => *poisoned.into_inner() = profile,
        }
    }
}

impl Default for StaticProfileProvider {
    fn default() -> Self {
        Self::new(UserProfile {
            preferred_categories: vec![WorkoutCategory::Strength, WorkoutCategory::Cardio],
            haptic_feedback: true,
            auto_start: false,
            display_metrics: DisplayMetrics::default(),
        })
    }
}

impl UserProfileProvider for StaticProfileProvider {
    fn current_profile(&self) -> UserProfile {
        match self.profile.read() {
            Ok(profile) => profile.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
