//! Seam to the OS notification subsystem.
//!
//! `NotificationPlatform` is what the registry and renderer talk to.
//! `InMemoryPlatform` keeps channels and active notifications in process and
//! can simulate the user tapping a notification.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;

use super::channel::{Importance, NotificationChannelDescriptor};

/// First API level that requires explicit notification channels
pub const CHANNELS_MIN_API_LEVEL: u32 = 26;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("notification channel {channel_id} could not be created: {reason}")]
    ChannelCreation { channel_id: String, reason: String },

    #[error("notification {id} could not be posted: {reason}")]
    Post { id: i32, reason: String },

    #[error("notifications are disabled for this application")]
    NotificationsDisabled,
}

/// OS notification subsystem
pub trait NotificationPlatform: Send + Sync {
    /// OS API level of the running device
    fn api_level(&self) -> u32;

    /// Whether notifications must be posted on an explicitly created channel
    fn requires_channels(&self) -> bool {
        self.api_level() >= CHANNELS_MIN_API_LEVEL
    }

    /// Create or update a channel. Re-creating an existing id is an update.
    fn create_channel(&self, descriptor: &NotificationChannelDescriptor) -> Result<(), PlatformError>;

    /// Post a notification, replacing any active one with the same id
    fn notify(&self, notification: PostedNotification) -> Result<(), PlatformError>;

    /// Remove an active notification
    fn cancel(&self, id: i32);
}

/// Legacy priority used below the channel API level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationPriority {
    Min,
    Low,
    Default,
    High,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentFlag {
    /// Reuse the running UI instance instead of stacking a new one
    ActivityClearTop,
}

/// Intent that starts or resumes the UI instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchIntent {
    pub component: String,
    pub flags: Vec<IntentFlag>,
    pub extras: HashMap<String, String>,
}

impl LaunchIntent {
    /// Plain launcher start with no extras
    pub fn launcher(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            flags: Vec::new(),
            extras: HashMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn string_extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }
}

/// Action fired when the user taps a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TapAction {
    pub intent: LaunchIntent,
    /// Extras cannot be rewritten by whoever fires the action
    pub immutable: bool,
}

impl TapAction {
    /// The intent delivered to the UI when the action fires
    pub fn invoke(&self) -> LaunchIntent {
        self.intent.clone()
    }
}

/// A notification as handed to the OS
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostedNotification {
    pub id: i32,
    pub channel_id: String,
    pub small_icon: String,
    pub title: String,
    pub body: String,
    pub auto_cancel: bool,
    pub sound_uri: String,
    pub priority: NotificationPriority,
    pub tap_action: TapAction,
}

/// Channel as stored by the in-memory platform
#[derive(Debug, Clone, Serialize)]
pub struct ChannelRecord {
    pub descriptor: NotificationChannelDescriptor,
    pub created_at: DateTime<Utc>,
}

/// In-process notification subsystem.
///
/// Mirrors the OS rules the bridge relies on: re-creating a channel only
/// refreshes its name and description, posting with an existing id replaces
/// the active notification, and tapping an auto-cancel notification dismisses
/// it.
pub struct InMemoryPlatform {
    api_level: u32,
    enabled: AtomicBool,
    channels: DashMap<String, ChannelRecord>,
    active: DashMap<i32, PostedNotification>,
    channel_create_calls: AtomicU64,
    posted_total: AtomicU64,
}

impl InMemoryPlatform {
    pub fn new(api_level: u32) -> Self {
        Self {
            api_level,
            enabled: AtomicBool::new(true),
            channels: DashMap::new(),
            active: DashMap::new(),
            channel_create_calls: AtomicU64::new(0),
            posted_total: AtomicU64::new(0),
        }
    }

    /// Simulate the user turning notifications off for the app
    pub fn set_notifications_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn channel(&self, id: &str) -> Option<ChannelRecord> {
        self.channels.get(id).map(|r| r.clone())
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of `create_channel` calls that reached the platform
    pub fn channel_create_calls(&self) -> u64 {
        self.channel_create_calls.load(Ordering::Relaxed)
    }

    /// Simulate the user lowering a channel's importance in system settings
    pub fn customize_importance(&self, channel_id: &str, importance: Importance) -> bool {
        match self.channels.get_mut(channel_id) {
            Some(mut record) => {
                record.descriptor.importance = importance;
                true
            }
            None => false,
        }
    }

    pub fn active_notification(&self, id: i32) -> Option<PostedNotification> {
        self.active.get(&id).map(|n| n.clone())
    }

    /// Active notifications, most recent id first
    pub fn active_notifications(&self) -> Vec<PostedNotification> {
        let mut all: Vec<_> = self.active.iter().map(|n| n.value().clone()).collect();
        all.sort_by(|a, b| b.id.cmp(&a.id));
        all
    }

    /// Total successful `notify` calls, including replacements
    pub fn posted_total(&self) -> u64 {
        self.posted_total.load(Ordering::Relaxed)
    }

    /// Simulate a tap on an active notification.
    ///
    /// Returns the intent that reaches the UI, or `None` if no notification
    /// with that id is showing.
    pub fn tap(&self, id: i32) -> Option<LaunchIntent> {
        let notification = self.active.get(&id).map(|n| n.clone())?;
        if notification.auto_cancel {
            self.active.remove(&id);
        }
        tracing::debug!(notification_id = id, "Notification tapped");
        Some(notification.tap_action.invoke())
    }
}

impl NotificationPlatform for InMemoryPlatform {
    fn api_level(&self) -> u32 {
        self.api_level
    }

    fn create_channel(&self, descriptor: &NotificationChannelDescriptor) -> Result<(), PlatformError> {
        self.channel_create_calls.fetch_add(1, Ordering::Relaxed);

        self.channels
            .entry(descriptor.id.clone())
            .and_modify(|record| {
                // User-controlled settings survive re-creation
                record.descriptor.display_name = descriptor.display_name.clone();
                record.descriptor.description = descriptor.description.clone();
            })
            .or_insert_with(|| ChannelRecord {
                descriptor: descriptor.clone(),
                created_at: Utc::now(),
            });

        Ok(())
    }

    fn notify(&self, notification: PostedNotification) -> Result<(), PlatformError> {
        if !self.enabled.load(Ordering::Relaxed) {
            return Err(PlatformError::NotificationsDisabled);
        }
        if self.requires_channels() && !self.channels.contains_key(&notification.channel_id) {
            return Err(PlatformError::Post {
                id: notification.id,
                reason: format!("unknown channel {}", notification.channel_id),
            });
        }

        self.active.insert(notification.id, notification);
        self.posted_total.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn cancel(&self, id: i32) {
        self.active.remove(&id);
    }
}
