use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::metrics::RenderMetrics;

use super::channel::{ChannelRegistry, NotificationChannelDescriptor};
use super::launch::{EXTRA_NOTIFICATION_BODY, EXTRA_NOTIFICATION_TITLE};
use super::platform::{
    IntentFlag, LaunchIntent, NotificationPlatform, NotificationPriority, PostedNotification,
    TapAction,
};
use super::CanonicalMessage;

/// Notification ids stay inside 28 bits so they are always positive
pub const NOTIFICATION_ID_MASK: i32 = 0x0FFF_FFFF;
const SMALL_ICON: &str = "android.R.drawable.ic_dialog_info";
const DEFAULT_SOUND_URI: &str = "content://settings/system/notification_sound";

/// How notification ids are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationIdStrategy {
    /// Epoch millis truncated to 28 bits. Two renders in the same millisecond
    /// share an id and the second replaces the first.
    #[default]
    TimeDerived,
    /// Per-renderer counter, wrapping inside the same 28-bit range
    Monotonic,
}

/// Identifies a posted notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedNotificationHandle {
    pub numeric_id: i32,
    pub channel_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RendererStatsSnapshot {
    pub rendered: u64,
    pub post_failed: u64,
}

/// Turns canonical messages into posted system notifications
pub struct NotificationRenderer {
    registry: Arc<ChannelRegistry>,
    platform: Arc<dyn NotificationPlatform>,
    descriptor: NotificationChannelDescriptor,
    launch_component: String,
    id_strategy: NotificationIdStrategy,
    next_id: AtomicI32,
    rendered: AtomicU64,
    post_failed: AtomicU64,
}

impl NotificationRenderer {
    pub fn new(
        registry: Arc<ChannelRegistry>,
        platform: Arc<dyn NotificationPlatform>,
        descriptor: NotificationChannelDescriptor,
        launch_component: impl Into<String>,
        id_strategy: NotificationIdStrategy,
    ) -> Self {
        Self {
            registry,
            platform,
            descriptor,
            launch_component: launch_component.into(),
            id_strategy,
            next_id: AtomicI32::new(1),
            rendered: AtomicU64::new(0),
            post_failed: AtomicU64::new(0),
        }
    }

    pub fn channel(&self) -> &NotificationChannelDescriptor {
        &self.descriptor
    }

    /// Post exactly one notification for the message.
    ///
    /// Posting is best effort: a platform failure is logged and counted, and
    /// the handle is still returned.
    pub fn render(&self, message: &CanonicalMessage) -> RenderedNotificationHandle {
        self.registry.ensure_channel(&self.descriptor);

        let id = self.next_notification_id();
        let notification = self.build(id, message);

        match self.platform.notify(notification) {
            Ok(()) => {
                self.rendered.fetch_add(1, Ordering::Relaxed);
                RenderMetrics::record_rendered();
                tracing::debug!(
                    notification_id = id,
                    message_id = %message.id(),
                    channel_id = %self.descriptor.id,
                    "Notification displayed"
                );
            }
            Err(e) => {
                self.post_failed.fetch_add(1, Ordering::Relaxed);
                RenderMetrics::record_post_failed();
                tracing::warn!(
                    notification_id = id,
                    message_id = %message.id(),
                    error = %e,
                    "Failed to post notification"
                );
            }
        }

        RenderedNotificationHandle {
            numeric_id: id,
            channel_id: self.descriptor.id.clone(),
        }
    }

    pub fn stats(&self) -> RendererStatsSnapshot {
        RendererStatsSnapshot {
            rendered: self.rendered.load(Ordering::Relaxed),
            post_failed: self.post_failed.load(Ordering::Relaxed),
        }
    }

    fn build(&self, id: i32, message: &CanonicalMessage) -> PostedNotification {
        let intent = LaunchIntent {
            component: self.launch_component.clone(),
            flags: vec![IntentFlag::ActivityClearTop],
            extras: Default::default(),
        }
        .with_extra(EXTRA_NOTIFICATION_TITLE, message.title())
        .with_extra(EXTRA_NOTIFICATION_BODY, message.body());

        PostedNotification {
            id,
            channel_id: self.descriptor.id.clone(),
            small_icon: SMALL_ICON.to_string(),
            title: message.title().to_string(),
            body: message.body().to_string(),
            auto_cancel: true,
            sound_uri: DEFAULT_SOUND_URI.to_string(),
            priority: NotificationPriority::Max,
            tap_action: TapAction {
                intent,
                immutable: true,
            },
        }
    }

    fn next_notification_id(&self) -> i32 {
        match self.id_strategy {
            NotificationIdStrategy::TimeDerived => time_derived_id(Utc::now().timestamp_millis()),
            NotificationIdStrategy::Monotonic => {
                self.next_id.fetch_add(1, Ordering::Relaxed) & NOTIFICATION_ID_MASK
            }
        }
    }
}

/// Truncate epoch millis to a non-negative 28-bit id
pub fn time_derived_id(epoch_millis: i64) -> i32 {
    (epoch_millis as i32) & NOTIFICATION_ID_MASK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::platform::InMemoryPlatform;
    use crate::notification::SUSTENTABAG_CHANNEL_ID;
    use std::collections::HashMap;

    fn renderer(
        platform: Arc<InMemoryPlatform>,
        strategy: NotificationIdStrategy,
    ) -> NotificationRenderer {
        let registry = Arc::new(ChannelRegistry::new(platform.clone()));
        NotificationRenderer::new(
            registry,
            platform,
            NotificationChannelDescriptor::sustentabag(),
            "com.example.sustenta_bag_application.MainActivity",
            strategy,
        )
    }

    #[test]
    fn test_time_derived_id_is_bounded_and_positive() {
        assert_eq!(time_derived_id(0), 0);
        assert_eq!(time_derived_id(0x1000_0005), 5);
        assert_eq!(time_derived_id(1_718_000_000_123), (1_718_000_000_123_i64 as i32) & 0x0FFF_FFFF);

        for millis in [i64::MAX, -1, 1_700_000_000_000, 4_102_444_800_000] {
            let id = time_derived_id(millis);
            assert!(id >= 0 && id <= NOTIFICATION_ID_MASK);
        }
    }

    #[test]
    fn test_render_posts_on_channel_with_tap_action() {
        let platform = Arc::new(InMemoryPlatform::new(34));
        let renderer = renderer(platform.clone(), NotificationIdStrategy::TimeDerived);
        let message = CanonicalMessage::new("Pedido Confirmado", "Seu pedido #123 foi confirmado", HashMap::new());

        let handle = renderer.render(&message);
        assert_eq!(handle.channel_id, SUSTENTABAG_CHANNEL_ID);

        let posted = platform.active_notification(handle.numeric_id).unwrap();
        assert_eq!(posted.title, "Pedido Confirmado");
        assert_eq!(posted.body, "Seu pedido #123 foi confirmado");
        assert_eq!(posted.priority, NotificationPriority::Max);
        assert!(posted.auto_cancel);
        assert!(posted.tap_action.immutable);

        let intent = posted.tap_action.invoke();
        assert_eq!(intent.flags, vec![IntentFlag::ActivityClearTop]);
        assert_eq!(intent.string_extra(EXTRA_NOTIFICATION_TITLE), Some("Pedido Confirmado"));
        assert_eq!(
            intent.string_extra(EXTRA_NOTIFICATION_BODY),
            Some("Seu pedido #123 foi confirmado")
        );
    }

    #[test]
    fn test_monotonic_ids_never_collide() {
        let platform = Arc::new(InMemoryPlatform::new(34));
        let renderer = renderer(platform.clone(), NotificationIdStrategy::Monotonic);

        let a = renderer.render(&CanonicalMessage::new("a", "a", HashMap::new()));
        let b = renderer.render(&CanonicalMessage::new("b", "b", HashMap::new()));

        assert_ne!(a.numeric_id, b.numeric_id);
        assert_eq!(platform.active_notifications().len(), 2);
    }

    #[test]
    fn test_post_failure_is_swallowed() {
        let platform = Arc::new(InMemoryPlatform::new(34));
        platform.set_notifications_enabled(false);
        let renderer = renderer(platform.clone(), NotificationIdStrategy::TimeDerived);

        let handle = renderer.render(&CanonicalMessage::new("x", "y", HashMap::new()));

        assert_eq!(handle.channel_id, SUSTENTABAG_CHANNEL_ID);
        assert_eq!(renderer.stats().post_failed, 1);
        assert_eq!(renderer.stats().rendered, 0);
    }

    #[test]
    fn test_render_ensures_channel_first() {
        let platform = Arc::new(InMemoryPlatform::new(34));
        let renderer = renderer(platform.clone(), NotificationIdStrategy::Monotonic);
        assert_eq!(platform.channel_count(), 0);

        renderer.render(&CanonicalMessage::new("x", "y", HashMap::new()));
        renderer.render(&CanonicalMessage::new("x", "y", HashMap::new()));

        assert_eq!(platform.channel_count(), 1);
        assert_eq!(platform.channel_create_calls(), 1);
    }
}
