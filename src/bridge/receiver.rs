use std::sync::Arc;

use thiserror::Error;

use crate::broadcast::{
    BroadcastEnvelope, BroadcastError, BroadcastReceiver, BroadcastSubscription, Broadcaster,
    ReceiverScope,
};

use super::method_channel::{BridgeCall, MethodChannel, NotificationPayload};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("bridge receiver is already attached")]
    AlreadyAttached,

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
}

/// Forwards each envelope across the method channel
struct BridgeForwarder {
    channel: Arc<MethodChannel>,
}

impl BroadcastReceiver for BridgeForwarder {
    fn on_receive(&self, envelope: &BroadcastEnvelope) -> bool {
        tracing::debug!(
            title = %envelope.title,
            body = %envelope.body,
            "Received notification broadcast"
        );

        self.channel
            .invoke(BridgeCall::OnNotificationReceived(NotificationPayload {
                title: envelope.title.clone(),
                body: envelope.body.clone(),
                timestamp: envelope.timestamp,
            }))
            .is_ok()
    }
}

enum ReceiverState {
    Detached,
    Attached(BroadcastSubscription),
}

/// Subscriber owned by one UI instance.
///
/// Starts detached. Holds at most one subscription, and dropping the
/// receiver detaches it.
pub struct BridgeReceiver {
    channel: Arc<MethodChannel>,
    state: ReceiverState,
}

impl BridgeReceiver {
    pub fn new(channel: Arc<MethodChannel>) -> Self {
        Self {
            channel,
            state: ReceiverState::Detached,
        }
    }

    /// Register with the broadcaster as a non-exported receiver.
    ///
    /// Attaching twice is a caller bug; it is refused and the existing
    /// subscription stays in place.
    pub fn attach(&mut self, broadcaster: &Arc<Broadcaster>) -> Result<(), LifecycleError> {
        if let ReceiverState::Attached(_) = self.state {
            tracing::error!(channel = %self.channel.name(), "Bridge receiver attached twice");
            return Err(LifecycleError::AlreadyAttached);
        }

        let forwarder = Arc::new(BridgeForwarder {
            channel: self.channel.clone(),
        });
        let subscription = broadcaster.subscribe(ReceiverScope::NotExported, forwarder)?;

        tracing::debug!(subscription_id = %subscription.id(), "Notification receiver registered");
        self.state = ReceiverState::Attached(subscription);
        Ok(())
    }

    /// Unregister. No-op when already detached.
    pub fn detach(&mut self) {
        if let ReceiverState::Attached(subscription) =
            std::mem::replace(&mut self.state, ReceiverState::Detached)
        {
            let id = subscription.id();
            drop(subscription);
            tracing::debug!(subscription_id = %id, "Notification receiver unregistered");
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.state, ReceiverState::Attached(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BRIDGE_CHANNEL_NAME;
    use crate::notification::CanonicalMessage;
    use std::collections::HashMap;

    fn setup() -> (Arc<Broadcaster>, Arc<MethodChannel>) {
        (
            Arc::new(Broadcaster::new("com.example.sustenta_bag_application")),
            Arc::new(MethodChannel::new(BRIDGE_CHANNEL_NAME)),
        )
    }

    #[test]
    fn test_attach_forwards_messages() {
        let (broadcaster, channel) = setup();
        let mut inbox = channel.configure_engine(8);
        let mut receiver = BridgeReceiver::new(channel.clone());

        receiver.attach(&broadcaster).unwrap();
        let message = CanonicalMessage::new("Oi", "Tudo bem?", HashMap::new());
        assert_eq!(broadcaster.publish(&message), 1);

        match inbox.try_recv() {
            Some(BridgeCall::OnNotificationReceived(payload)) => {
                assert_eq!(payload.title, "Oi");
                assert_eq!(payload.body, "Tudo bem?");
                assert!(payload.timestamp >= message.received_at_millis());
            }
            other => panic!("unexpected bridge call: {:?}", other),
        }
    }

    #[test]
    fn test_second_attach_is_refused() {
        let (broadcaster, channel) = setup();
        let mut receiver = BridgeReceiver::new(channel);

        receiver.attach(&broadcaster).unwrap();
        assert_eq!(receiver.attach(&broadcaster), Err(LifecycleError::AlreadyAttached));
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[test]
    fn test_detach_is_idempotent() {
        let (broadcaster, channel) = setup();
        let mut receiver = BridgeReceiver::new(channel);

        receiver.detach();
        receiver.attach(&broadcaster).unwrap();
        receiver.detach();
        receiver.detach();

        assert!(!receiver.is_attached());
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn test_reattach_after_detach() {
        let (broadcaster, channel) = setup();
        let mut receiver = BridgeReceiver::new(channel);

        receiver.attach(&broadcaster).unwrap();
        receiver.detach();
        receiver.attach(&broadcaster).unwrap();
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[test]
    fn test_drop_detaches() {
        let (broadcaster, channel) = setup();
        {
            let mut receiver = BridgeReceiver::new(channel);
            receiver.attach(&broadcaster).unwrap();
            assert_eq!(broadcaster.subscriber_count(), 1);
        }
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn test_unconfigured_engine_drops_message() {
        let (broadcaster, channel) = setup();
        let mut receiver = BridgeReceiver::new(channel.clone());
        receiver.attach(&broadcaster).unwrap();

        let delivered = broadcaster.publish(&CanonicalMessage::new("a", "b", HashMap::new()));

        assert_eq!(delivered, 0);
        assert_eq!(channel.stats().dropped, 1);
    }
}
