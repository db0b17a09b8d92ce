//! Posted notification inspection and tap simulation.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::host::UiStatus;
use crate::notification::{LaunchContext, PostedNotification};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct TapResponse {
    pub notification_id: i32,
    /// Whether the tap removed the notification from the shade
    pub dismissed: bool,
    pub launch_context: Option<LaunchContext>,
    pub ui: UiStatus,
}

/// GET /api/v1/notifications
pub async fn list_notifications(State(state): State<AppState>) -> Json<Vec<PostedNotification>> {
    Json(state.platform.active_notifications())
}

/// POST /api/v1/notifications/{id}/tap
///
/// Fires the notification's tap action and routes the resulting intent to the
/// UI host, cold-starting an instance when none is alive.
#[tracing::instrument(name = "http.tap_notification", skip(state))]
pub async fn tap_notification(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TapResponse>> {
    let intent = state
        .platform
        .tap(id)
        .ok_or_else(|| AppError::NotFound(format!("notification {}", id)))?;

    let ui = state.ui.deliver_intent(&intent).await?;

    Ok(Json(TapResponse {
        notification_id: id,
        dismissed: state.platform.active_notification(id).is_none(),
        launch_context: ui.launch_context.clone(),
        ui,
    }))
}
