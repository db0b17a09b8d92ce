//! Lifecycle of the simulated UI instance.

use axum::{extract::State, http::StatusCode, Json};

use crate::bridge::{MethodCall, MethodResult};
use crate::error::Result;
use crate::host::UiStatus;
use crate::notification::LaunchContext;
use crate::server::AppState;

/// GET /api/v1/ui
pub async fn ui_status(State(state): State<AppState>) -> Json<UiStatus> {
    Json(state.ui.status().await)
}

/// POST /api/v1/ui/start
pub async fn start_ui(State(state): State<AppState>) -> Result<Json<UiStatus>> {
    let intent = state.context.launcher_intent();
    Ok(Json(state.ui.start(&intent).await?))
}

/// DELETE /api/v1/ui
pub async fn stop_ui(State(state): State<AppState>) -> Result<StatusCode> {
    state.ui.stop().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/ui/method
pub async fn call_method(
    State(state): State<AppState>,
    Json(call): Json<MethodCall>,
) -> Result<Json<MethodResult>> {
    Ok(Json(state.ui.call_method(&call).await?))
}

/// DELETE /api/v1/ui/launch-context
pub async fn take_launch_context(
    State(state): State<AppState>,
) -> Result<Json<Option<LaunchContext>>> {
    Ok(Json(state.ui.take_launch_context().await?))
}
