//! Push transports feeding `MessageIntake`.

mod backoff;
mod http;
mod redis;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use http::{ingest_push, refresh_token, TokenRefreshRequest, TokenRefreshResponse};
pub use redis::{RedisPushTransport, TransportEvent};
