pub mod health_relay;
pub mod notification_bus;
pub mod profile_provider;
pub mod scheduler;
pub mod sync_coordinator;

pub use health_relay::RedisHealthRelay;
pub use notification_bus::{BusEvent, NotificationBus};
pub use profile_provider::{StaticProfileProvider, UserProfile, UserProfileProvider};
pub use scheduler::{AutoSyncScheduler, SchedulerError};
pub use sync_coordinator::{SyncCoordinator, SyncError, SyncOutcome};
