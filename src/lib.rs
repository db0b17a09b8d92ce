// Shared infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Push bridge core
pub mod bridge;
pub mod broadcast;
pub mod context;
pub mod notification;

// Application layer
pub mod api;
pub mod host;
pub mod server;
pub mod triggers;
