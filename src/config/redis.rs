use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::services::health_relay::DEFAULT_HEALTH_CHANNEL;

#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: SecretString,
    #[serde(default = "default_health_channel")]
    pub health_channel: String,
}

fn default_health_channel() -> String {
    DEFAULT_HEALTH_CHANNEL.to_string()
}

impl RedisSettings {
    pub fn get_redis_url(&self) -> SecretString {
        let password = self.password.expose_secret();
        let url = if password.is_empty() {
            format!("redis://{}:{}", self.host, self.port)
        } else {
            format!("redis://:{}@{}:{}", password, self.host, self.port)
        };
        SecretString::new(url.into_boxed_str())
    }
}
