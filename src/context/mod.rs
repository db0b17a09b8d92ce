//! Process-scoped owner of the push bridge components.
//!
//! Built once at the process entry point and shared as `Arc<PushContext>`;
//! nothing in the crate reaches for global state.

use std::sync::Arc;

use crate::broadcast::Broadcaster;
use crate::config::Settings;
use crate::notification::{
    ChannelRegistry, LaunchIntent, LaunchIntentResolver, MessageIntake,
    NotificationChannelDescriptor, NotificationPlatform, NotificationRenderer, TokenStore,
};

/// Component started by launcher and notification-tap intents
const LAUNCH_ACTIVITY: &str = "MainActivity";

pub struct PushContext {
    launch_component: String,
    platform: Arc<dyn NotificationPlatform>,
    channels: Arc<ChannelRegistry>,
    renderer: Arc<NotificationRenderer>,
    broadcaster: Arc<Broadcaster>,
    resolver: Arc<LaunchIntentResolver>,
    intake: Arc<MessageIntake>,
}

impl PushContext {
    /// Wire the components and create the notification channel up front
    pub fn new(settings: &Settings, platform: Arc<dyn NotificationPlatform>) -> Self {
        let package = settings.platform.package_name.clone();
        let launch_component = format!("{}.{}", package, LAUNCH_ACTIVITY);
        let descriptor = NotificationChannelDescriptor::sustentabag();

        let channels = Arc::new(ChannelRegistry::new(platform.clone()));
        channels.ensure_channel(&descriptor);

        let renderer = Arc::new(NotificationRenderer::new(
            channels.clone(),
            platform.clone(),
            descriptor,
            launch_component.clone(),
            settings.notification.id_strategy,
        ));
        let broadcaster = Arc::new(Broadcaster::new(package));
        let tokens = Arc::new(TokenStore::new());
        let intake = Arc::new(MessageIntake::new(
            renderer.clone(),
            broadcaster.clone(),
            tokens,
        ));

        tracing::info!(
            api_level = platform.api_level(),
            id_strategy = ?settings.notification.id_strategy,
            action = %broadcaster.action(),
            "Push context initialized"
        );

        Self {
            launch_component,
            platform,
            channels,
            renderer,
            broadcaster,
            resolver: Arc::new(LaunchIntentResolver::new()),
            intake,
        }
    }

    /// Intent of a plain launcher start
    pub fn launcher_intent(&self) -> LaunchIntent {
        LaunchIntent::launcher(self.launch_component.clone())
    }

    pub fn platform(&self) -> &Arc<dyn NotificationPlatform> {
        &self.platform
    }

    pub fn channels(&self) -> &Arc<ChannelRegistry> {
        &self.channels
    }

    pub fn renderer(&self) -> &Arc<NotificationRenderer> {
        &self.renderer
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    pub fn resolver(&self) -> &Arc<LaunchIntentResolver> {
        &self.resolver
    }

    pub fn intake(&self) -> &Arc<MessageIntake> {
        &self.intake
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{InMemoryPlatform, SUSTENTABAG_CHANNEL_ID};

    #[test]
    fn test_channel_created_at_startup() {
        let platform = Arc::new(InMemoryPlatform::new(34));
        let ctx = PushContext::new(&Settings::default(), platform.clone());

        assert!(platform.channel(SUSTENTABAG_CHANNEL_ID).is_some());
        assert!(ctx.channels().is_created(SUSTENTABAG_CHANNEL_ID));
        assert_eq!(
            ctx.launcher_intent().component,
            "com.example.sustenta_bag_application.MainActivity"
        );
    }
}
