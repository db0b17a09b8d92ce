//! Prometheus metrics for the push bridge.
//!
//! - Intake metrics (messages received, tokens refreshed, launch contexts)
//! - Render metrics (notifications posted, post failures, channels created)
//! - Broadcast metrics (deliveries, unobserved publishes, live subscribers)
//! - Bridge metrics (calls forwarded to or dropped before the UI runtime)
//! - Transport metrics (Redis messages and reconnects)

mod helpers;

pub use helpers::{
    encode_metrics, BridgeMetrics, BroadcastMetrics, IntakeMetrics, RenderMetrics,
    TransportMetrics,
};

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "sustentabag_push";

lazy_static! {
    // ============================================================================
    // Intake Metrics
    // ============================================================================

    /// Push deliveries accepted by intake
    pub static ref MESSAGES_RECEIVED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_messages_received_total", METRIC_PREFIX),
        "Total push messages accepted by intake"
    ).unwrap();

    /// Registration token refreshes
    pub static ref TOKENS_REFRESHED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_tokens_refreshed_total", METRIC_PREFIX),
        "Total registration token refreshes"
    ).unwrap();

    /// UI starts or re-entries caused by a notification tap
    pub static ref LAUNCH_CONTEXTS_RESOLVED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_launch_contexts_resolved_total", METRIC_PREFIX),
        "Total launch intents carrying notification context"
    ).unwrap();

    // ============================================================================
    // Render Metrics
    // ============================================================================

    pub static ref NOTIFICATIONS_RENDERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_rendered_total", METRIC_PREFIX),
        "Total notifications posted to the platform"
    ).unwrap();

    pub static ref NOTIFICATIONS_POST_FAILED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_post_failed_total", METRIC_PREFIX),
        "Total notifications the platform refused"
    ).unwrap();

    pub static ref CHANNELS_CREATED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_channels_created_total", METRIC_PREFIX),
        "Total notification channels created"
    ).unwrap();

    /// Notifications currently shown by the platform, sampled at scrape time
    pub static ref ACTIVE_NOTIFICATIONS: IntGauge = register_int_gauge!(
        format!("{}_active_notifications", METRIC_PREFIX),
        "Number of notifications currently posted"
    ).unwrap();

    // ============================================================================
    // Broadcast Metrics
    // ============================================================================

    pub static ref BROADCAST_DELIVERIES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_broadcast_deliveries_total", METRIC_PREFIX),
        "Total broadcasts accepted by live receivers"
    ).unwrap();

    /// Publishes that found no live receiver
    pub static ref BROADCAST_UNOBSERVED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_broadcast_unobserved_total", METRIC_PREFIX),
        "Total broadcasts published with no live receiver"
    ).unwrap();

    pub static ref BROADCAST_SUBSCRIBERS: IntGauge = register_int_gauge!(
        format!("{}_broadcast_subscribers", METRIC_PREFIX),
        "Number of registered broadcast receivers"
    ).unwrap();

    // ============================================================================
    // Bridge Metrics
    // ============================================================================

    pub static ref BRIDGE_CALLS_FORWARDED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_bridge_calls_forwarded_total", METRIC_PREFIX),
        "Total calls queued for the UI runtime"
    ).unwrap();

    pub static ref UI_INSTANCE_RUNNING: IntGauge = register_int_gauge!(
        format!("{}_ui_instance_running", METRIC_PREFIX),
        "Whether a UI instance is alive (1) or not (0)"
    ).unwrap();

    /// Calls dropped before reaching the UI runtime, by reason
    pub static ref BRIDGE_CALLS_DROPPED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_bridge_calls_dropped_total", METRIC_PREFIX),
        "Total calls dropped before reaching the UI runtime",
        &["reason"]
    ).unwrap();

    // ============================================================================
    // Transport Metrics
    // ============================================================================

    pub static ref REDIS_MESSAGES_RECEIVED: IntCounterVec = register_int_counter_vec!(
        format!("{}_redis_messages_received_total", METRIC_PREFIX),
        "Total messages received from Redis pub/sub",
        &["kind"]
    ).unwrap();

    pub static ref REDIS_RECONNECTIONS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_redis_reconnections_total", METRIC_PREFIX),
        "Total Redis reconnection attempts"
    ).unwrap();
}
