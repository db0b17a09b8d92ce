use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::server::{api_key_auth, AppState};
use crate::triggers::{ingest_push, refresh_token};

use super::health::{health, stats};
use super::metrics::prometheus_metrics;
use super::notifications::{list_notifications, tap_notification};
use super::ui::{call_method, start_ui, stop_ui, take_launch_context, ui_status};

pub fn api_routes(state: AppState) -> Router<AppState> {
    // Push ingest requires the API key when one is configured
    let ingest = Router::new()
        .route("/push", post(ingest_push))
        .route("/push/token", post(refresh_token))
        .route_layer(middleware::from_fn_with_state(state, api_key_auth));

    Router::new()
        // Health, stats & metrics
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api/v1",
            Router::new()
                .merge(ingest)
                // Posted notifications
                .route("/notifications", get(list_notifications))
                .route("/notifications/{id}/tap", post(tap_notification))
                // UI instance
                .route("/ui", get(ui_status).delete(stop_ui))
                .route("/ui/start", post(start_ui))
                .route("/ui/method", post(call_method))
                .route("/ui/launch-context", delete(take_launch_context)),
        )
}
