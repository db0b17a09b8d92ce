use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::metrics::RenderMetrics;

use super::platform::NotificationPlatform;

/// Id of the single channel every bridge notification is posted on
pub const SUSTENTABAG_CHANNEL_ID: &str = "sustentabag_notifications_channel";

/// Channel importance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Importance {
    Low,
    #[default]
    Default,
    High,
}

/// OS notification channel definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannelDescriptor {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub importance: Importance,
    pub lights_enabled: bool,
    pub vibration_enabled: bool,
}

impl NotificationChannelDescriptor {
    /// The process-wide channel
    pub fn sustentabag() -> Self {
        Self {
            id: SUSTENTABAG_CHANNEL_ID.to_string(),
            display_name: "SustentaBag Notifications".to_string(),
            description: "Notificações do aplicativo SustentaBag".to_string(),
            importance: Importance::High,
            lights_enabled: true,
            vibration_enabled: true,
        }
    }
}

/// Snapshot of registry statistics
#[derive(Debug, Clone, Serialize)]
pub struct ChannelRegistryStats {
    pub channels_created: usize,
    pub ensure_calls: u64,
    pub creation_failures: u64,
}

/// Creates notification channels at most once per process.
///
/// The OS treats re-creation as an update, but this registry only calls it the
/// first time an id is seen so user changes are never touched again. The
/// DashMap entry lock serializes concurrent first calls for the same id.
pub struct ChannelRegistry {
    platform: Arc<dyn NotificationPlatform>,
    created: DashMap<String, DateTime<Utc>>,
    ensure_calls: AtomicU64,
    creation_failures: AtomicU64,
}

impl ChannelRegistry {
    pub fn new(platform: Arc<dyn NotificationPlatform>) -> Self {
        Self {
            platform,
            created: DashMap::new(),
            ensure_calls: AtomicU64::new(0),
            creation_failures: AtomicU64::new(0),
        }
    }

    /// Make sure the channel exists.
    ///
    /// Returns true only for the call that actually created it. Never fails:
    /// a platform error is logged and the next call retries.
    pub fn ensure_channel(&self, descriptor: &NotificationChannelDescriptor) -> bool {
        self.ensure_calls.fetch_add(1, Ordering::Relaxed);

        if !self.platform.requires_channels() {
            return false;
        }

        if self.created.contains_key(&descriptor.id) {
            return false;
        }

        match self.created.entry(descriptor.id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => match self.platform.create_channel(descriptor) {
                Ok(()) => {
                    slot.insert(Utc::now());
                    RenderMetrics::record_channel_created();
                    tracing::info!(
                        channel_id = %descriptor.id,
                        importance = ?descriptor.importance,
                        "Notification channel created"
                    );
                    true
                }
                Err(e) => {
                    self.creation_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        channel_id = %descriptor.id,
                        error = %e,
                        "Failed to create notification channel"
                    );
                    false
                }
            },
        }
    }

    pub fn is_created(&self, channel_id: &str) -> bool {
        self.created.contains_key(channel_id)
    }

    pub fn stats(&self) -> ChannelRegistryStats {
        ChannelRegistryStats {
            channels_created: self.created.len(),
            ensure_calls: self.ensure_calls.load(Ordering::Relaxed),
            creation_failures: self.creation_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::platform::{InMemoryPlatform, PlatformError, PostedNotification};

    struct FlakyPlatform {
        fail: std::sync::atomic::AtomicBool,
    }

    impl NotificationPlatform for FlakyPlatform {
        fn api_level(&self) -> u32 {
            34
        }

        fn create_channel(&self, descriptor: &NotificationChannelDescriptor) -> Result<(), PlatformError> {
            if self.fail.swap(false, Ordering::SeqCst) {
                return Err(PlatformError::ChannelCreation {
                    channel_id: descriptor.id.clone(),
                    reason: "service unavailable".to_string(),
                });
            }
            Ok(())
        }

        fn notify(&self, _notification: PostedNotification) -> Result<(), PlatformError> {
            Ok(())
        }

        fn cancel(&self, _id: i32) {}
    }

    #[test]
    fn test_descriptor_constants() {
        let descriptor = NotificationChannelDescriptor::sustentabag();
        assert_eq!(descriptor.id, "sustentabag_notifications_channel");
        assert_eq!(descriptor.importance, Importance::High);
        assert!(descriptor.lights_enabled);
        assert!(descriptor.vibration_enabled);
    }

    #[test]
    fn test_ensure_channel_is_idempotent() {
        let platform = Arc::new(InMemoryPlatform::new(34));
        let registry = ChannelRegistry::new(platform.clone());
        let descriptor = NotificationChannelDescriptor::sustentabag();

        assert!(registry.ensure_channel(&descriptor));
        for _ in 0..10 {
            assert!(!registry.ensure_channel(&descriptor));
        }

        assert_eq!(platform.channel_count(), 1);
        assert_eq!(platform.channel_create_calls(), 1);
        assert_eq!(registry.stats().ensure_calls, 11);
    }

    #[test]
    fn test_concurrent_first_calls_create_once() {
        let platform = Arc::new(InMemoryPlatform::new(34));
        let registry = Arc::new(ChannelRegistry::new(platform.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry.ensure_channel(&NotificationChannelDescriptor::sustentabag())
                })
            })
            .collect();

        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|created| *created)
            .count();

        assert_eq!(created, 1);
        assert_eq!(platform.channel_create_calls(), 1);
    }

    #[test]
    fn test_no_channel_needed_on_legacy_api() {
        let platform = Arc::new(InMemoryPlatform::new(25));
        let registry = ChannelRegistry::new(platform.clone());

        assert!(!registry.ensure_channel(&NotificationChannelDescriptor::sustentabag()));
        assert_eq!(platform.channel_create_calls(), 0);
        assert!(!registry.is_created(SUSTENTABAG_CHANNEL_ID));
    }

    #[test]
    fn test_failed_creation_is_retried() {
        let platform = Arc::new(FlakyPlatform {
            fail: std::sync::atomic::AtomicBool::new(true),
        });
        let registry = ChannelRegistry::new(platform);
        let descriptor = NotificationChannelDescriptor::sustentabag();

        assert!(!registry.ensure_channel(&descriptor));
        assert!(!registry.is_created(&descriptor.id));
        assert!(registry.ensure_channel(&descriptor));
        assert_eq!(registry.stats().creation_failures, 1);
    }
}
