use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::notification::NotificationIdStrategy;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Push transport settings (Redis pub/sub)
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Channels carrying push deliveries and token refresh events
    #[serde(default)]
    pub channels: Vec<String>,
    /// Set to false to run with the HTTP ingest endpoint only
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    pub key: Option<String>,
}

/// Host platform facts the bridge depends on
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Application package; broadcasts never leave it
    #[serde(default = "default_package_name")]
    pub package_name: String,
    /// OS API level. Channels are required from 26 on.
    #[serde(default = "default_api_level")]
    pub api_level: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub id_strategy: NotificationIdStrategy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Capacity of the native-to-UI call queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

/// OpenTelemetry export settings
#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_true() -> bool {
    true
}

fn default_package_name() -> String {
    "com.example.sustenta_bag_application".to_string()
}

fn default_api_level() -> u32 {
    34
}

fn default_queue_capacity() -> usize {
    32
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "sustentabag-push-bridge".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        Self::load(&run_mode, environment())
    }

    fn load(run_mode: &str, environment: Environment) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("redis.url", default_redis_url())?
            .set_default("platform.package_name", default_package_name())?
            .set_default("platform.api_level", default_api_level() as i64)?
            .set_default("bridge.queue_capacity", default_queue_capacity() as i64)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(environment);

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// SERVER__PORT, REDIS__URL, PLATFORM__API_LEVEL, NOTIFICATION__ID_STRATEGY, ...
///
/// Double underscore keeps snake_case field names intact. Only the list keys
/// are split on commas; every other value stays a scalar.
fn environment() -> Environment {
    Environment::default()
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("redis.channels")
        .with_list_parse_key("server.cors_origins")
}

impl RedisConfig {
    /// Configured channels, or the default message and token channels
    pub fn channels(&self) -> Vec<String> {
        if self.channels.is_empty() {
            vec!["push:messages".to_string(), "push:tokens".to_string()]
        } else {
            self.channels.clone()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            channels: vec![],
            enabled: true,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            package_name: default_package_name(),
            api_level: default_api_level(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            redis: RedisConfig::default(),
            api: ApiConfig::default(),
            platform: PlatformConfig::default(),
            notification: NotificationConfig::default(),
            bridge: BridgeConfig::default(),
            otel: OtelConfig::default(),
        }
    }
}
