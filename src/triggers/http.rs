//! HTTP push ingest, the counterpart of the Redis transport for callers that
//! cannot publish to Redis.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::notification::{IntakeOutcome, RawPushPayload};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenRefreshRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenRefreshResponse {
    pub accepted: bool,
    pub refreshed_at: DateTime<Utc>,
}

/// POST /api/v1/push
#[tracing::instrument(
    name = "http.ingest_push",
    skip(state, payload),
    fields(transport_message_id = ?payload.message_id)
)]
pub async fn ingest_push(
    State(state): State<AppState>,
    Json(payload): Json<RawPushPayload>,
) -> Json<IntakeOutcome> {
    Json(state.context.intake().on_message_received(&payload))
}

/// POST /api/v1/push/token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<TokenRefreshRequest>,
) -> Result<Json<TokenRefreshResponse>> {
    let intake = state.context.intake();
    if !intake.on_new_token(&request.token) {
        return Err(AppError::Validation("token must not be blank".to_string()));
    }

    let refreshed_at = intake
        .tokens()
        .current()
        .map(|t| t.refreshed_at)
        .unwrap_or_else(Utc::now);

    Ok(Json(TokenRefreshResponse {
        accepted: true,
        refreshed_at,
    }))
}
