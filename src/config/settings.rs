use std::env;
use std::time::Duration;

use config::{Config, ConfigError, File};
use dotenv::dotenv;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::redis::RedisSettings;
use crate::models::{DisplayMetrics, WorkoutCategory};

#[derive(Deserialize, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub redis: Option<RedisSettings>,
    pub device: DeviceSettings,
    pub sync: SyncEngineSettings,
    #[serde(default)]
    pub profile: ProfileSettings,
}

#[derive(Deserialize, Debug)]
pub struct ApplicationSettings {
    pub port: u16,
    pub host: String,
    pub log_level: String,
    #[serde(default)]
    pub store_backend: StoreBackend,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Deserialize, Debug)]
pub struct DatabaseSettings {
    pub user: String,
    pub password: SecretString,
    pub port: u16,
    pub host: String,
    pub db_name: String,
    #[serde(default)]
    pub db_url: Option<SecretString>,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> SecretString {
        match &self.db_url {
            Some(db_url) => db_url.clone(),
            None => SecretString::new(
                format!(
                    "postgres://{}:{}@{}:{}/{}",
                    self.user,
                    self.password.expose_secret(),
                    self.host,
                    self.port,
                    self.db_name
                )
                .into_boxed_str(),
            ),
        }
    }

    /// Server-level connection, used to create throwaway test databases.
    pub fn connection_string_without_db(&self) -> SecretString {
        SecretString::new(
            format!(
                "postgres://{}:{}@{}:{}",
                self.user,
                self.password.expose_secret(),
                self.host,
                self.port
            )
            .into_boxed_str(),
        )
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTransport {
    #[default]
    Http,
    Scripted,
}

#[derive(Deserialize, Debug)]
pub struct DeviceSettings {
    #[serde(default)]
    pub transport: DeviceTransport,
    pub relay_url: String,
    pub api_key: SecretString,
    pub request_timeout_secs: u64,
}

#[derive(Deserialize, Debug)]
pub struct SyncEngineSettings {
    pub auto_sync_enabled: bool,
    pub auto_sync_interval_secs: u64,
    pub phase_timeout_secs: u64,
    pub bus_capacity: usize,
}

impl SyncEngineSettings {
    /// The interval to arm at startup. `None` when auto-sync is off or the
    /// interval is zero.
    pub fn auto_sync_interval(&self) -> Option<Duration> {
        if !self.auto_sync_enabled || self.auto_sync_interval_secs == 0 {
            return None;
        }
        Some(Duration::from_secs(self.auto_sync_interval_secs))
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProfileSettings {
    #[serde(default)]
    pub preferred_categories: Vec<WorkoutCategory>,
    #[serde(default = "default_true")]
    pub haptic_feedback: bool,
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default)]
    pub display_metrics: DisplayMetrics,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            preferred_categories: Vec::new(),
            haptic_feedback: true,
            auto_start: false,
            display_metrics: DisplayMetrics::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

pub fn get_config() -> Result<Settings, ConfigError> {
    let base_path = env::current_dir()
        .map_err(|e| ConfigError::Message(format!("Failed to determine the current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    dotenv().ok();

    let environment: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;

    let env_filename = format!("{}.yml", environment.as_str());
    let config = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yml")))
        .add_source(File::from(configuration_directory.join(env_filename)).required(false))
        .add_source(
            config::Environment::default()
                .prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let mut settings = config.try_deserialize::<Settings>()?;

    if let Ok(db_url) = env::var("DATABASE_URL") {
        settings.database.db_url = Some(SecretString::new(db_url.into_boxed_str()));
    }

    if let Ok(api_key) = env::var("DEVICE_RELAY_API_KEY") {
        settings.device.api_key = SecretString::new(api_key.into_boxed_str());
    }

    Ok(settings)
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. \
                Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync_settings(enabled: bool, interval_secs: u64) -> SyncEngineSettings {
        SyncEngineSettings {
            auto_sync_enabled: enabled,
            auto_sync_interval_secs: interval_secs,
            phase_timeout_secs: 30,
            bus_capacity: 64,
        }
    }

    #[test]
    fn test_auto_sync_interval() {
        assert_eq!(sync_settings(true, 300).auto_sync_interval(), Some(Duration::from_secs(300)));
        assert_eq!(sync_settings(false, 300).auto_sync_interval(), None);
        assert_eq!(sync_settings(true, 0).auto_sync_interval(), None);
    }
}
