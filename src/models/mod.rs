pub mod common;
pub mod health;
pub mod message;
pub mod sync_settings;
pub mod sync_state;
pub mod workout_session;

pub use health::HealthSnapshot;
pub use message::{CommunicationResult, DeviceCommand, Message};
pub use sync_settings::{DisplayMetrics, UserSyncSettings};
pub use sync_state::{CycleReport, SyncPhase, SyncState, SyncStatus};
pub use workout_session::{HeartRateReading, WorkoutCategory, WorkoutSession};
