//! API layer - HTTP endpoint handlers organized by domain.

mod health;
mod metrics;
mod notifications;
mod routes;
mod ui;

pub use health::{health, stats, HealthResponse, StatsResponse};
pub use metrics::prometheus_metrics;
pub use notifications::{list_notifications, tap_notification, TapResponse};
pub use routes::api_routes;
pub use ui::{call_method, start_ui, stop_ui, take_launch_context, ui_status};
