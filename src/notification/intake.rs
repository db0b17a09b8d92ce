use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::broadcast::Broadcaster;
use crate::metrics::IntakeMetrics;
use crate::telemetry::attributes;

use super::renderer::{NotificationRenderer, RenderedNotificationHandle};
use super::token::TokenStore;
use super::{CanonicalMessage, RawPushPayload};

/// What happened to one accepted delivery
#[derive(Debug, Clone, Serialize)]
pub struct IntakeOutcome {
    pub message: CanonicalMessage,
    pub notification: RenderedNotificationHandle,
    /// Live receivers that accepted the broadcast
    pub delivered_to: usize,
}

#[derive(Debug, Default)]
struct IntakeStats {
    received: AtomicU64,
    tokens_refreshed: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntakeStatsSnapshot {
    pub received: u64,
    pub tokens_refreshed: u64,
}

/// Entry point for everything the push transport delivers.
///
/// Safe to call from any thread and concurrently with itself; each delivery
/// is processed to completion independently.
pub struct MessageIntake {
    renderer: Arc<NotificationRenderer>,
    broadcaster: Arc<Broadcaster>,
    tokens: Arc<TokenStore>,
    stats: IntakeStats,
}

impl MessageIntake {
    pub fn new(
        renderer: Arc<NotificationRenderer>,
        broadcaster: Arc<Broadcaster>,
        tokens: Arc<TokenStore>,
    ) -> Self {
        Self {
            renderer,
            broadcaster,
            tokens,
            stats: IntakeStats::default(),
        }
    }

    /// Accept a push delivery.
    ///
    /// Never fails: missing fields degrade to defaults. The notification is
    /// rendered before the broadcast so a visible trace exists even when no
    /// receiver is live.
    #[tracing::instrument(
        name = "intake.on_message_received",
        skip(self, payload),
        fields(from = ?payload.from, transport_message_id = ?payload.message_id)
    )]
    pub fn on_message_received(&self, payload: &RawPushPayload) -> IntakeOutcome {
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        IntakeMetrics::record_received();

        if let Some(notification) = &payload.notification {
            tracing::debug!(
                title = ?notification.title,
                body = ?notification.body,
                "Message notification payload"
            );
        }
        if !payload.data.is_empty() {
            tracing::debug!(data = ?payload.data, "Message data payload");
        }

        let message = CanonicalMessage::from_payload(payload);
        let notification = self.renderer.render(&message);
        let delivered_to = self.broadcaster.publish(&message);

        let span = tracing::Span::current();
        for kv in [
            attributes::message_id(message.id()),
            attributes::notification_id(notification.numeric_id),
            attributes::channel_id(&notification.channel_id),
            attributes::delivered_count(delivered_to),
        ] {
            span.set_attribute(kv.key, kv.value);
        }

        tracing::info!(
            message_id = %message.id(),
            notification_id = notification.numeric_id,
            delivered_to = delivered_to,
            "Push message processed"
        );

        IntakeOutcome {
            message,
            notification,
            delivered_to,
        }
    }

    /// Accept a token refresh from the transport
    pub fn on_new_token(&self, token: &str) -> bool {
        let recorded = self.tokens.record(token);
        if recorded {
            self.stats.tokens_refreshed.fetch_add(1, Ordering::Relaxed);
        }
        recorded
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn stats(&self) -> IntakeStatsSnapshot {
        IntakeStatsSnapshot {
            received: self.stats.received.load(Ordering::Relaxed),
            tokens_refreshed: self.stats.tokens_refreshed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{BroadcastEnvelope, BroadcastReceiver, ReceiverScope};
    use crate::notification::platform::InMemoryPlatform;
    use crate::notification::{
        ChannelRegistry, NotificationChannelDescriptor, NotificationIdStrategy, DEFAULT_BODY,
        DEFAULT_TITLE,
    };
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        platform_posts_seen: Mutex<Vec<u64>>,
        platform: Option<Arc<InMemoryPlatform>>,
    }

    impl BroadcastReceiver for Recorder {
        fn on_receive(&self, _envelope: &BroadcastEnvelope) -> bool {
            let posted = self.platform.as_ref().map(|p| p.posted_total()).unwrap_or(0);
            self.platform_posts_seen.lock().unwrap().push(posted);
            true
        }
    }

    fn intake(platform: Arc<InMemoryPlatform>) -> (MessageIntake, Arc<Broadcaster>) {
        let registry = Arc::new(ChannelRegistry::new(platform.clone()));
        let renderer = Arc::new(NotificationRenderer::new(
            registry,
            platform,
            NotificationChannelDescriptor::sustentabag(),
            "com.example.sustenta_bag_application.MainActivity",
            NotificationIdStrategy::Monotonic,
        ));
        let broadcaster = Arc::new(Broadcaster::new("com.example.sustenta_bag_application"));
        let intake = MessageIntake::new(renderer, broadcaster.clone(), Arc::new(TokenStore::new()));
        (intake, broadcaster)
    }

    #[test]
    fn test_renders_before_broadcasting() {
        let platform = Arc::new(InMemoryPlatform::new(34));
        let (intake, broadcaster) = intake(platform.clone());
        let recorder = Arc::new(Recorder {
            platform: Some(platform.clone()),
            ..Recorder::default()
        });
        let _sub = broadcaster
            .subscribe(ReceiverScope::NotExported, recorder.clone())
            .unwrap();

        let outcome = intake.on_message_received(&RawPushPayload::notification("a", "b"));

        assert_eq!(outcome.delivered_to, 1);
        assert_eq!(*recorder.platform_posts_seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_malformed_payloads_still_render() {
        let platform = Arc::new(InMemoryPlatform::new(34));
        let (intake, _broadcaster) = intake(platform.clone());

        let outcome = intake.on_message_received(&RawPushPayload::default());

        assert_eq!(outcome.message.title(), DEFAULT_TITLE);
        assert_eq!(outcome.message.body(), DEFAULT_BODY);
        assert_eq!(outcome.delivered_to, 0);
        assert_eq!(platform.posted_total(), 1);
        assert_eq!(intake.stats().received, 1);
    }

    #[test]
    fn test_token_refresh_recorded() {
        let platform = Arc::new(InMemoryPlatform::new(34));
        let (intake, _broadcaster) = intake(platform);

        assert!(intake.on_new_token("fcm-token-1"));
        assert!(!intake.on_new_token(""));

        assert_eq!(intake.tokens().current().unwrap().token, "fcm-token-1");
        assert_eq!(intake.stats().tokens_refreshed, 1);
    }
}
