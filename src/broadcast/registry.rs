use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::metrics::BroadcastMetrics;
use crate::notification::CanonicalMessage;

use super::types::{
    BroadcastEnvelope, BroadcastError, BroadcastReceiver, BroadcastStatsSnapshot, ReceiverScope,
    NOTIFICATION_RECEIVED_SUFFIX,
};

#[derive(Debug, Default)]
struct BroadcastStats {
    published: AtomicU64,
    delivered: AtomicU64,
    rejected: AtomicU64,
    unobserved: AtomicU64,
}

/// In-process pub/sub for received messages.
///
/// Only non-exported receivers can register, and every envelope is stamped
/// with the owning package. Nothing is buffered: a publish with no
/// subscribers is dropped.
pub struct Broadcaster {
    package: String,
    action: String,
    receivers: DashMap<Uuid, Arc<dyn BroadcastReceiver>>,
    stats: BroadcastStats,
}

impl Broadcaster {
    pub fn new(package: impl Into<String>) -> Self {
        let package = package.into();
        let action = format!("{}.{}", package, NOTIFICATION_RECEIVED_SUFFIX);
        Self {
            package,
            action,
            receivers: DashMap::new(),
            stats: BroadcastStats::default(),
        }
    }

    /// The private action every envelope carries
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Register a receiver.
    ///
    /// The returned guard unregisters on drop.
    pub fn subscribe(
        self: &Arc<Self>,
        scope: ReceiverScope,
        receiver: Arc<dyn BroadcastReceiver>,
    ) -> Result<BroadcastSubscription, BroadcastError> {
        if scope != ReceiverScope::NotExported {
            tracing::error!(action = %self.action, "Rejected exported receiver registration");
            return Err(BroadcastError::ExportedReceiver {
                action: self.action.clone(),
            });
        }

        let id = Uuid::new_v4();
        self.receivers.insert(id, receiver);
        BroadcastMetrics::set_subscribers(self.receivers.len());

        tracing::debug!(subscription_id = %id, action = %self.action, "Receiver registered");

        Ok(BroadcastSubscription {
            id,
            broadcaster: Arc::downgrade(self),
        })
    }

    fn unsubscribe(&self, id: Uuid) -> bool {
        let removed = self.receivers.remove(&id).is_some();
        if removed {
            BroadcastMetrics::set_subscribers(self.receivers.len());
            tracing::debug!(subscription_id = %id, "Receiver unregistered");
        }
        removed
    }

    /// Deliver a message to every registered receiver.
    ///
    /// Returns how many receivers accepted it. Delivery happens under the
    /// registry's shard locks, so a receiver is either fully registered or
    /// not seen at all, and one that has unregistered is never called.
    pub fn publish(&self, message: &CanonicalMessage) -> usize {
        let envelope = BroadcastEnvelope::for_message(
            &self.action,
            &self.package,
            message,
            Utc::now().timestamp_millis(),
        );
        self.stats.published.fetch_add(1, Ordering::Relaxed);

        let mut seen = 0;
        let mut accepted = 0;
        for entry in self.receivers.iter() {
            seen += 1;
            if entry.value().on_receive(&envelope) {
                accepted += 1;
            }
        }

        if seen == 0 {
            self.stats.unobserved.fetch_add(1, Ordering::Relaxed);
            BroadcastMetrics::record_unobserved();
            tracing::debug!(
                message_id = %message.id(),
                "No live receiver, broadcast dropped"
            );
            return 0;
        }

        self.stats.delivered.fetch_add(accepted as u64, Ordering::Relaxed);
        self.stats.rejected.fetch_add((seen - accepted) as u64, Ordering::Relaxed);
        BroadcastMetrics::record_delivered(accepted as u64);

        tracing::debug!(
            message_id = %message.id(),
            receivers = seen,
            accepted = accepted,
            "Broadcast sent"
        );

        accepted
    }

    pub fn subscriber_count(&self) -> usize {
        self.receivers.len()
    }

    pub fn stats(&self) -> BroadcastStatsSnapshot {
        BroadcastStatsSnapshot {
            published: self.stats.published.load(Ordering::Relaxed),
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
            unobserved: self.stats.unobserved.load(Ordering::Relaxed),
            active_subscribers: self.receivers.len(),
        }
    }
}

/// Registration guard. Dropping it unregisters the receiver.
#[must_use = "dropping the subscription unregisters the receiver"]
pub struct BroadcastSubscription {
    id: Uuid,
    broadcaster: Weak<Broadcaster>,
}

impl BroadcastSubscription {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl std::fmt::Debug for BroadcastSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastSubscription")
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for BroadcastSubscription {
    fn drop(&mut self) {
        if let Some(broadcaster) = self.broadcaster.upgrade() {
            broadcaster.unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<BroadcastEnvelope>>,
    }

    impl BroadcastReceiver for Recorder {
        fn on_receive(&self, envelope: &BroadcastEnvelope) -> bool {
            self.seen.lock().unwrap().push(envelope.clone());
            true
        }
    }

    struct Refuser;

    impl BroadcastReceiver for Refuser {
        fn on_receive(&self, _envelope: &BroadcastEnvelope) -> bool {
            false
        }
    }

    fn broadcaster() -> Arc<Broadcaster> {
        Arc::new(Broadcaster::new("com.example.sustenta_bag_application"))
    }

    fn message() -> CanonicalMessage {
        CanonicalMessage::new("Oferta", "Nova sacola disponível", HashMap::new())
    }

    #[test]
    fn test_action_is_package_scoped() {
        let broadcaster = broadcaster();
        assert_eq!(
            broadcaster.action(),
            "com.example.sustenta_bag_application.NOTIFICATION_RECEIVED"
        );
    }

    #[test]
    fn test_publish_reaches_subscriber() {
        let broadcaster = broadcaster();
        let recorder = Arc::new(Recorder::default());
        let _sub = broadcaster
            .subscribe(ReceiverScope::NotExported, recorder.clone())
            .unwrap();

        let message = message();
        assert_eq!(broadcaster.publish(&message), 1);

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].title, "Oferta");
        assert_eq!(seen[0].package, "com.example.sustenta_bag_application");
        assert!(seen[0].timestamp >= message.received_at_millis());
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let broadcaster = broadcaster();
        assert_eq!(broadcaster.publish(&message()), 0);

        let stats = broadcaster.stats();
        assert_eq!(stats.published, 1);
        assert_eq!(stats.unobserved, 1);
    }

    #[test]
    fn test_exported_receiver_rejected() {
        let broadcaster = broadcaster();
        let result = broadcaster.subscribe(ReceiverScope::Exported, Arc::new(Recorder::default()));

        assert!(matches!(result, Err(BroadcastError::ExportedReceiver { .. })));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn test_dropping_subscription_unregisters() {
        let broadcaster = broadcaster();
        let recorder = Arc::new(Recorder::default());
        let sub = broadcaster
            .subscribe(ReceiverScope::NotExported, recorder.clone())
            .unwrap();
        assert_eq!(broadcaster.subscriber_count(), 1);

        drop(sub);
        assert_eq!(broadcaster.subscriber_count(), 0);
        assert_eq!(broadcaster.publish(&message()), 0);
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_refused_deliveries_counted() {
        let broadcaster = broadcaster();
        let _a = broadcaster
            .subscribe(ReceiverScope::NotExported, Arc::new(Refuser))
            .unwrap();
        let _b = broadcaster
            .subscribe(ReceiverScope::NotExported, Arc::new(Recorder::default()))
            .unwrap();

        assert_eq!(broadcaster.publish(&message()), 1);
        let stats = broadcaster.stats();
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn test_subscription_outliving_broadcaster_is_harmless() {
        let broadcaster = broadcaster();
        let sub = broadcaster
            .subscribe(ReceiverScope::NotExported, Arc::new(Refuser))
            .unwrap();
        drop(broadcaster);
        drop(sub);
    }
}
