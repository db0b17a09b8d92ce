//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    BRIDGE_CALLS_DROPPED_TOTAL, BRIDGE_CALLS_FORWARDED_TOTAL, BROADCAST_DELIVERIES_TOTAL,
    BROADCAST_SUBSCRIBERS, BROADCAST_UNOBSERVED_TOTAL, CHANNELS_CREATED_TOTAL,
    LAUNCH_CONTEXTS_RESOLVED_TOTAL, MESSAGES_RECEIVED_TOTAL, NOTIFICATIONS_POST_FAILED_TOTAL,
    NOTIFICATIONS_RENDERED_TOTAL, REDIS_MESSAGES_RECEIVED, REDIS_RECONNECTIONS_TOTAL,
    TOKENS_REFRESHED_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording intake metrics
pub struct IntakeMetrics;

impl IntakeMetrics {
    pub fn record_received() {
        MESSAGES_RECEIVED_TOTAL.inc();
    }

    pub fn record_token_refreshed() {
        TOKENS_REFRESHED_TOTAL.inc();
    }

    pub fn record_launch_resolved() {
        LAUNCH_CONTEXTS_RESOLVED_TOTAL.inc();
    }
}

/// Helper struct for recording render metrics
pub struct RenderMetrics;

impl RenderMetrics {
    pub fn record_rendered() {
        NOTIFICATIONS_RENDERED_TOTAL.inc();
    }

    pub fn record_post_failed() {
        NOTIFICATIONS_POST_FAILED_TOTAL.inc();
    }

    pub fn record_channel_created() {
        CHANNELS_CREATED_TOTAL.inc();
    }
}

/// Helper struct for recording broadcast metrics
pub struct BroadcastMetrics;

impl BroadcastMetrics {
    pub fn record_delivered(count: u64) {
        BROADCAST_DELIVERIES_TOTAL.inc_by(count);
    }

    pub fn record_unobserved() {
        BROADCAST_UNOBSERVED_TOTAL.inc();
    }

    pub fn set_subscribers(count: usize) {
        BROADCAST_SUBSCRIBERS.set(count as i64);
    }
}

/// Helper struct for recording bridge metrics
pub struct BridgeMetrics;

impl BridgeMetrics {
    pub fn record_forwarded() {
        BRIDGE_CALLS_FORWARDED_TOTAL.inc();
    }

    /// Record a dropped call with its reason label
    pub fn record_dropped(reason: &str) {
        BRIDGE_CALLS_DROPPED_TOTAL.with_label_values(&[reason]).inc();
    }
}

/// Helper struct for recording transport metrics
pub struct TransportMetrics;

impl TransportMetrics {
    /// Record a Redis message by kind ("message", "new_token", "invalid")
    pub fn record_redis_message(kind: &str) {
        REDIS_MESSAGES_RECEIVED.with_label_values(&[kind]).inc();
    }

    pub fn record_reconnect() {
        REDIS_RECONNECTIONS_TOTAL.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_recorded_metrics() {
        IntakeMetrics::record_received();
        BridgeMetrics::record_dropped("queue_full");

        let output = encode_metrics().unwrap();
        assert!(output.contains("sustentabag_push_messages_received_total"));
        assert!(output.contains("sustentabag_push_bridge_calls_dropped_total"));
    }
}
