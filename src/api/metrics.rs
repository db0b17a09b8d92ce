//! Prometheus metrics endpoint.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::metrics;
use crate::server::AppState;

/// GET /metrics - Prometheus metrics endpoint
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    update_metrics_from_state(&state).await;

    match metrics::encode_metrics() {
        Ok(output) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode Prometheus metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(axum::http::header::CONTENT_TYPE, "text/plain")],
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

/// Sample gauges that are not updated on the hot path
async fn update_metrics_from_state(state: &AppState) {
    metrics::ACTIVE_NOTIFICATIONS.set(state.platform.active_notifications().len() as i64);
    metrics::UI_INSTANCE_RUNNING.set(if state.ui.is_running().await { 1 } else { 0 });
    metrics::BROADCAST_SUBSCRIBERS.set(state.context.broadcaster().subscriber_count() as i64);
}
