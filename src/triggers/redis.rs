use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::RedisConfig;
use crate::metrics::TransportMetrics;
use crate::notification::{MessageIntake, RawPushPayload};

use super::backoff::ExponentialBackoff;

/// Event published by the messaging backend on a push channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportEvent {
    /// A push delivery; the payload fields sit next to the tag
    Message(RawPushPayload),
    /// The provider rotated the device registration token
    NewToken { token: String },
}

impl TransportEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportEvent::Message(_) => "message",
            TransportEvent::NewToken { .. } => "new_token",
        }
    }

    /// Hand the event to intake
    pub fn apply(&self, intake: &MessageIntake) {
        match self {
            TransportEvent::Message(payload) => {
                intake.on_message_received(payload);
            }
            TransportEvent::NewToken { token } => {
                intake.on_new_token(token);
            }
        }
    }
}

fn is_pattern(channel: &str) -> bool {
    channel.contains('*') || channel.contains('?') || channel.contains('[')
}

/// Redis pub/sub push transport.
///
/// Subscribes to the configured channels and feeds every event into
/// `MessageIntake`. Lost connections are retried with exponential backoff
/// until shutdown is signalled.
pub struct RedisPushTransport {
    config: RedisConfig,
    intake: Arc<MessageIntake>,
    shutdown: broadcast::Sender<()>,
}

impl RedisPushTransport {
    pub fn new(config: RedisConfig, intake: Arc<MessageIntake>) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            config,
            intake,
            shutdown,
        }
    }

    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        let channels = self.config.channels();
        tracing::info!(channels = ?channels, url = %self.config.url, "Starting Redis push transport");

        let mut shutdown_rx = self.shutdown.subscribe();
        let mut backoff = ExponentialBackoff::new();

        loop {
            match self
                .run_subscription_loop(&channels, &mut backoff, &mut shutdown_rx)
                .await
            {
                Ok(()) => {
                    tracing::info!("Redis push transport stopped gracefully");
                    break;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    TransportMetrics::record_reconnect();
                    tracing::error!(
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "Redis subscription error, reconnecting"
                    );

                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            tracing::info!("Shutdown requested while reconnecting");
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        Ok(())
    }

    async fn run_subscription_loop(
        &self,
        channels: &[String],
        backoff: &mut ExponentialBackoff,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let client = redis::Client::open(self.config.url.as_str())?;
        let mut pubsub = client.get_async_pubsub().await?;

        for channel in channels {
            if is_pattern(channel) {
                pubsub.psubscribe(channel).await?;
                tracing::debug!(pattern = %channel, "Subscribed to pattern");
            } else {
                pubsub.subscribe(channel).await?;
                tracing::debug!(channel = %channel, "Subscribed to channel");
            }
        }

        backoff.reset();
        tracing::info!("Redis subscription established");

        let mut message_stream = pubsub.on_message();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Received shutdown signal");
                    return Ok(());
                }
                msg = message_stream.next() => {
                    let Some(msg) = msg else {
                        anyhow::bail!("Redis message stream ended");
                    };

                    let channel = msg.get_channel_name().to_string();
                    match msg.get_payload::<String>() {
                        Ok(payload) => self.handle_message(&channel, &payload),
                        Err(e) => tracing::warn!(error = %e, channel = %channel, "Failed to get message payload"),
                    }
                }
            }
        }
    }

    fn handle_message(&self, channel: &str, payload: &str) {
        let event: TransportEvent = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(e) => {
                TransportMetrics::record_redis_message("invalid");
                tracing::warn!(
                    error = %e,
                    channel = %channel,
                    "Failed to parse push transport event"
                );
                return;
            }
        };

        TransportMetrics::record_redis_message(event.kind());
        tracing::debug!(channel = %channel, kind = event.kind(), "Received push transport event");
        event.apply(&self.intake);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Broadcaster;
    use crate::notification::{
        ChannelRegistry, InMemoryPlatform, NotificationChannelDescriptor, NotificationIdStrategy,
        NotificationRenderer, TokenStore,
    };

    fn intake() -> (Arc<InMemoryPlatform>, Arc<MessageIntake>) {
        let platform = Arc::new(InMemoryPlatform::new(34));
        let registry = Arc::new(ChannelRegistry::new(platform.clone()));
        let renderer = Arc::new(NotificationRenderer::new(
            registry,
            platform.clone(),
            NotificationChannelDescriptor::sustentabag(),
            "com.example.app.MainActivity".to_string(),
            NotificationIdStrategy::Monotonic,
        ));
        let broadcaster = Arc::new(Broadcaster::new("com.example.app"));
        let intake = Arc::new(MessageIntake::new(
            renderer,
            broadcaster,
            Arc::new(TokenStore::new()),
        ));
        (platform, intake)
    }

    #[test]
    fn test_parse_message_event() {
        let json = r#"{
            "type": "message",
            "message_id": "0:1700000000",
            "notification": {"title": "Pedido Confirmado", "body": "Seu pedido #123 foi confirmado"},
            "data": {"order_id": 123, "empty": null}
        }"#;

        let event: TransportEvent = serde_json::from_str(json).unwrap();
        let TransportEvent::Message(payload) = event else {
            panic!("expected a message event");
        };
        assert_eq!(payload.message_id.as_deref(), Some("0:1700000000"));
        assert_eq!(payload.data.get("order_id").map(String::as_str), Some("123"));
        assert!(!payload.data.contains_key("empty"));
    }

    #[test]
    fn test_parse_bare_message_event() {
        let event: TransportEvent = serde_json::from_str(r#"{"type":"message"}"#).unwrap();
        assert_eq!(event, TransportEvent::Message(RawPushPayload::default()));
    }

    #[test]
    fn test_parse_token_event() {
        let event: TransportEvent =
            serde_json::from_str(r#"{"type":"new_token","token":"fcm-abc"}"#).unwrap();
        assert_eq!(
            event,
            TransportEvent::NewToken {
                token: "fcm-abc".to_string()
            }
        );
        assert_eq!(event.kind(), "new_token");
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(serde_json::from_str::<TransportEvent>(r#"{"type":"ping"}"#).is_err());
    }

    #[test]
    fn test_apply_feeds_intake() {
        let (platform, intake) = intake();

        TransportEvent::Message(RawPushPayload::notification("Oferta", "Nova sacola")).apply(&intake);
        TransportEvent::NewToken {
            token: "tok-1".to_string(),
        }
        .apply(&intake);

        assert_eq!(platform.active_notifications().len(), 1);
        assert_eq!(intake.stats().received, 1);
        assert_eq!(intake.tokens().current().unwrap().token, "tok-1");
    }

    #[test]
    fn test_pattern_detection() {
        assert!(is_pattern("push:*"));
        assert!(is_pattern("push:user:?"));
        assert!(!is_pattern("push:messages"));
    }
}
