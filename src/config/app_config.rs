use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use super::{
    ServerConfig, deserialize_duration_from_ms, deserialize_duration_from_seconds,
};

/// Application configuration for the SMS health monitor.
///
/// Values are layered from an optional `app.yaml` and then from unprefixed
/// environment variables (`TTL_MINUTES`, `PROCESSING_INTERVAL_MINUTES`,
/// `ERROR_THRESHOLD_PERCENT`, `REDIS_ENDPOINT`, `REDIS_PORT`, ...), so a
/// deployment that only sets the environment works without a config file.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Time-to-live, in minutes, applied to a window key on every write.
    pub ttl_minutes: u64,

    /// Lag, in minutes, subtracted from "now" to select the evaluated bucket.
    pub processing_interval_minutes: u32,

    /// Aggregate error percentage above which an evaluation is a breach.
    pub error_threshold_percent: u32,

    /// Host of the key-value store.
    pub redis_endpoint: String,

    /// Port of the key-value store.
    pub redis_port: u16,

    /// How often the evaluator runs, independent of the lag.
    #[serde(deserialize_with = "deserialize_duration_from_seconds")]
    pub evaluation_interval_secs: Duration,

    /// Client-side bound on a single store call.
    #[serde(deserialize_with = "deserialize_duration_from_ms")]
    pub store_timeout_ms: Duration,

    /// The maximum time in seconds to wait for graceful shutdown.
    #[serde(deserialize_with = "deserialize_duration_from_seconds")]
    pub shutdown_timeout: Duration,

    /// Server configuration
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 30,
            processing_interval_minutes: 2,
            error_threshold_percent: 10,
            redis_endpoint: "127.0.0.1".to_string(),
            redis_port: 6379,
            evaluation_interval_secs: Duration::from_secs(30),
            store_timeout_ms: Duration::from_millis(2000),
            shutdown_timeout: Duration::from_secs(30),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Creates a new `AppConfig` from `<config_dir>/app.yaml` (if present)
    /// overlaid with environment variables.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir_str)).required(false))
            .add_source(Environment::default().separator("__").try_parsing(true))
            .build()?;
        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make the monitor silently useless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_minutes == 0 {
            return Err(ConfigError::Message("ttl_minutes must be greater than zero".into()));
        }
        // A zero lag would evaluate the bucket recorders are still writing to.
        if self.processing_interval_minutes == 0 {
            return Err(ConfigError::Message(
                "processing_interval_minutes must be greater than zero".into(),
            ));
        }
        if self.evaluation_interval_secs.is_zero() {
            return Err(ConfigError::Message(
                "evaluation_interval_secs must be greater than zero".into(),
            ));
        }
        if self.store_timeout_ms.is_zero() {
            return Err(ConfigError::Message("store_timeout_ms must be greater than zero".into()));
        }
        Ok(())
    }

    /// The TTL refreshed on every recorder write.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes * 60)
    }

    /// Connection URL for the key-value store.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/", self.redis_endpoint, self.redis_port)
    }

    /// Creates a new `AppConfigBuilder` for testing purposes.
    #[cfg(test)]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

/// A builder for creating `AppConfig` instances for testing.
#[cfg(test)]
#[derive(Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn ttl_minutes(mut self, minutes: u64) -> Self {
        self.config.ttl_minutes = minutes;
        self
    }

    pub fn processing_interval_minutes(mut self, minutes: u32) -> Self {
        self.config.processing_interval_minutes = minutes;
        self
    }

    pub fn error_threshold_percent(mut self, percent: u32) -> Self {
        self.config.error_threshold_percent = percent;
        self
    }

    pub fn redis(mut self, endpoint: &str, port: u16) -> Self {
        self.config.redis_endpoint = endpoint.to_string();
        self.config.redis_port = port;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
