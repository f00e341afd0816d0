//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `sensor-ingest.toml`.
//!     layers built-in defaults, the optional toml file and the SENSOR_*
//!     environment variables with the `config` crate (last wins).
//!
//! structure:
//!     - UpstreamConfig: Where the sheet export lives and how long to wait for it.
//!     - PollingConfig: How often the sheet is polled.
//!     - ServerConfig: Port of the snapshot API.
//!     - LoggingConfig: Log level and whether to log every published reading.
//!
//! ==============================================================================

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_ENDPOINT: &str = "https://script.google.com/macros/s/AKfycbx2V97T9d-zr6QDsLa-brN5mLXYmpjP85dDDbzpq7EFXt-k_oqSb5S-X_0ytARcEWQ0Pw/exec";

/// SENSOR_ENDPOINT, SENSOR_FETCH_INTERVAL_MS, SENSOR_API_PORT,
/// SENSOR_FETCH_TIMEOUT_MS, SENSOR_LOG_LEVEL
pub const ENV_PREFIX: &str = "SENSOR";

/// searched in order, later files override earlier ones; both are optional
pub const CONFIG_FILES: [&str; 2] = ["../config/sensor-ingest", "config/sensor-ingest"];

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct IngestConfig {
    pub upstream: UpstreamConfig,
    pub polling: PollingConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

/// the flat SENSOR_* variables, keyed without the prefix
#[derive(Debug, Deserialize, Default)]
struct EnvOverrides {
    endpoint: Option<String>,
    fetch_interval_ms: Option<u64>,
    fetch_timeout_ms: Option<u64>,
    api_port: Option<u16>,
    log_level: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: 15_000,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_ms: 10_000 }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 5174 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_sensor_data: false,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl IngestConfig {
    /// defaults, then `config/sensor-ingest.toml`, then SENSOR_* variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&CONFIG_FILES, Environment::with_prefix(ENV_PREFIX))
    }

    pub fn load(files: &[&str], env: Environment) -> Result<Self, ConfigError> {
        let overrides: EnvOverrides = Config::builder()
            .add_source(env)
            .build()?
            .try_deserialize()?;

        let mut builder = Config::builder();
        for file in files {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        let mut config: IngestConfig = builder
            .set_override_option("upstream.endpoint", non_blank(overrides.endpoint))?
            .set_override_option("upstream.timeout_ms", overrides.fetch_timeout_ms)?
            .set_override_option("polling.interval_ms", overrides.fetch_interval_ms)?
            .set_override_option("server.port", overrides.api_port.map(u64::from))?
            .set_override_option("logging.level", non_blank(overrides.log_level))?
            .build()?
            .try_deserialize()?;

        config.logging.level = config.logging.level.to_lowercase();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.polling.interval_ms == 0 {
            return Err(ConfigError::Message(
                "poll interval (polling.interval_ms / SENSOR_FETCH_INTERVAL_MS) must be > 0".to_string(),
            ));
        }
        if self.upstream.timeout_ms == 0 {
            return Err(ConfigError::Message(
                "fetch timeout (upstream.timeout_ms / SENSOR_FETCH_TIMEOUT_MS) must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream.timeout_ms)
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        info!("┌─────────────────────────────────────────┐");
        info!("│         INGEST CONFIGURATION            │");
        info!("├─────────────────────────────────────────┤");
        info!("│ Endpoint: {}", self.upstream.endpoint);
        info!("│ Fetch Timeout: {}ms", self.upstream.timeout_ms);
        info!("│ Poll Interval: {}ms", self.polling.interval_ms);
        info!("│ API Port: {}", self.server.port);
        info!("│ Log Level: {}", self.logging.level);
        info!("└─────────────────────────────────────────┘");
    }
}
