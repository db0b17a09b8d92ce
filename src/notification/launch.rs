use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::metrics::IntakeMetrics;

use super::platform::LaunchIntent;

/// Intent extra carrying the tapped notification's title
pub const EXTRA_NOTIFICATION_TITLE: &str = "notification_title";
/// Intent extra carrying the tapped notification's body
pub const EXTRA_NOTIFICATION_BODY: &str = "notification_body";

/// Why the UI instance was started or resumed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchContext {
    pub title: Option<String>,
    pub body: Option<String>,
}

impl LaunchContext {
    pub fn from_intent(intent: &LaunchIntent) -> Self {
        Self {
            title: intent.string_extra(EXTRA_NOTIFICATION_TITLE).map(str::to_string),
            body: intent.string_extra(EXTRA_NOTIFICATION_BODY).map(str::to_string),
        }
    }

    /// Both extras present, i.e. the intent came from a notification tap
    pub fn is_complete(&self) -> bool {
        self.title.is_some() && self.body.is_some()
    }
}

/// Inspects start/resume intents for notification-tap context.
///
/// Never re-renders: the tapped notification is already on its way out.
#[derive(Debug, Default)]
pub struct LaunchIntentResolver {
    resolved: AtomicU64,
}

impl LaunchIntentResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, intent: &LaunchIntent) -> Option<LaunchContext> {
        let context = LaunchContext::from_intent(intent);
        if !context.is_complete() {
            return None;
        }

        self.resolved.fetch_add(1, Ordering::Relaxed);
        IntakeMetrics::record_launch_resolved();
        tracing::info!(
            title = context.title.as_deref().unwrap_or_default(),
            body = context.body.as_deref().unwrap_or_default(),
            component = %intent.component,
            "Notification clicked"
        );

        Some(context)
    }

    /// Number of intents that carried notification context
    pub fn resolved_count(&self) -> u64 {
        self.resolved.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_tap_intent() {
        let resolver = LaunchIntentResolver::new();
        let intent = LaunchIntent::launcher("MainActivity")
            .with_extra(EXTRA_NOTIFICATION_TITLE, "Pedido Confirmado")
            .with_extra(EXTRA_NOTIFICATION_BODY, "Seu pedido #123 foi confirmado");

        let context = resolver.resolve(&intent).unwrap();
        assert_eq!(context.title.as_deref(), Some("Pedido Confirmado"));
        assert_eq!(context.body.as_deref(), Some("Seu pedido #123 foi confirmado"));
        assert_eq!(resolver.resolved_count(), 1);
    }

    #[test]
    fn test_plain_launch_is_a_no_op() {
        let resolver = LaunchIntentResolver::new();
        assert!(resolver.resolve(&LaunchIntent::launcher("MainActivity")).is_none());
        assert_eq!(resolver.resolved_count(), 0);
    }

    #[test]
    fn test_partial_extras_are_ignored() {
        let resolver = LaunchIntentResolver::new();
        let intent =
            LaunchIntent::launcher("MainActivity").with_extra(EXTRA_NOTIFICATION_TITLE, "Só título");

        let context = LaunchContext::from_intent(&intent);
        assert_eq!(context.title.as_deref(), Some("Só título"));
        assert!(!context.is_complete());
        assert!(resolver.resolve(&intent).is_none());
    }
}
