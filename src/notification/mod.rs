//! Push message intake, notification channels, local rendering and launch
//! intent resolution.

mod channel;
mod intake;
mod launch;
pub mod platform;
mod renderer;
mod token;
mod types;

pub use channel::{
    ChannelRegistry, ChannelRegistryStats, Importance, NotificationChannelDescriptor,
    SUSTENTABAG_CHANNEL_ID,
};
pub use intake::{IntakeOutcome, IntakeStatsSnapshot, MessageIntake};
pub use launch::{
    LaunchContext, LaunchIntentResolver, EXTRA_NOTIFICATION_BODY, EXTRA_NOTIFICATION_TITLE,
};
pub use platform::{
    InMemoryPlatform, IntentFlag, LaunchIntent, NotificationPlatform, NotificationPriority,
    PlatformError, PostedNotification, TapAction,
};
pub use renderer::{
    time_derived_id, NotificationIdStrategy, NotificationRenderer, RenderedNotificationHandle,
    RendererStatsSnapshot, NOTIFICATION_ID_MASK,
};
pub use token::{RegistrationToken, TokenStore};
pub use types::{CanonicalMessage, RawPushPayload, RemoteNotification, DEFAULT_BODY, DEFAULT_TITLE};
