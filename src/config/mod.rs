mod settings;

pub use settings::{
    ApiConfig, BridgeConfig, NotificationConfig, OtelConfig, PlatformConfig, RedisConfig,
    ServerConfig, Settings,
};
