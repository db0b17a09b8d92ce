//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::broadcast::BroadcastStatsSnapshot;
use crate::bridge::MethodChannelStats;
use crate::notification::{
    ChannelRegistryStats, IntakeStatsSnapshot, NotificationPlatform, RendererStatsSnapshot,
    SUSTENTABAG_CHANNEL_ID,
};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub platform: PlatformHealthResponse,
    pub ui: UiHealthResponse,
    pub transport: TransportHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct PlatformHealthResponse {
    pub api_level: u32,
    pub channels_required: bool,
    pub channel_ready: bool,
}

#[derive(Debug, Serialize)]
pub struct UiHealthResponse {
    pub running: bool,
    pub receiver_attached: bool,
}

#[derive(Debug, Serialize)]
pub struct TransportHealthResponse {
    pub redis_enabled: bool,
    pub channels: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub intake: IntakeStatsSnapshot,
    pub renderer: RendererStatsSnapshot,
    pub channels: ChannelRegistryStats,
    pub broadcast: BroadcastStatsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<MethodChannelStats>,
    pub launch_contexts_resolved: u64,
    pub active_notifications: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let platform = state.context.platform();
    let channel_ready =
        !platform.requires_channels() || state.context.channels().is_created(SUSTENTABAG_CHANNEL_ID);
    let ui = state.ui.status().await;

    // The push path still works without a channel, it just cannot be seen
    let status = if channel_ready { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        platform: PlatformHealthResponse {
            api_level: platform.api_level(),
            channels_required: platform.requires_channels(),
            channel_ready,
        },
        ui: UiHealthResponse {
            running: ui.running,
            receiver_attached: ui.attached,
        },
        transport: TransportHealthResponse {
            redis_enabled: state.settings.redis.enabled,
            channels: state.settings.redis.channels(),
        },
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let ctx = &state.context;
    let ui = state.ui.status().await;

    Json(StatsResponse {
        intake: ctx.intake().stats(),
        renderer: ctx.renderer().stats(),
        channels: ctx.channels().stats(),
        broadcast: ctx.broadcaster().stats(),
        bridge: ui.bridge,
        launch_contexts_resolved: ctx.resolver().resolved_count(),
        active_notifications: state.platform.active_notifications().len(),
    })
}
