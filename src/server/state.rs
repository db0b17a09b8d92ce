use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::context::PushContext;
use crate::host::UiHost;
use crate::notification::InMemoryPlatform;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub context: Arc<PushContext>,
    /// Concrete platform handle for listing and tapping posted notifications
    pub platform: Arc<InMemoryPlatform>,
    pub ui: Arc<UiHost>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let platform = Arc::new(InMemoryPlatform::new(settings.platform.api_level));
        let context = Arc::new(PushContext::new(&settings, platform.clone()));
        let ui = Arc::new(UiHost::new(context.clone(), settings.bridge.queue_capacity));

        Self {
            settings: Arc::new(settings),
            context,
            platform,
            ui,
            start_time: Instant::now(),
        }
    }
}
