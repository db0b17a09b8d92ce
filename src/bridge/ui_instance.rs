use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::context::PushContext;
use crate::notification::{LaunchContext, LaunchIntent, LaunchIntentResolver};

use super::method_channel::{
    BridgeInbox, MethodCall, MethodChannel, MethodChannelStats, MethodResult,
    BRIDGE_CHANNEL_NAME, METHOD_IS_NOTIFICATION_SERVICE_RUNNING,
};
use super::receiver::{BridgeReceiver, LifecycleError};

/// One live UI runtime instance.
///
/// Creating it attaches its bridge receiver; dropping it detaches exactly
/// once. No other code path attaches or detaches, so a subscription can never
/// outlive the instance that owns it.
pub struct UiInstance {
    id: Uuid,
    channel: Arc<MethodChannel>,
    receiver: BridgeReceiver,
    resolver: Arc<LaunchIntentResolver>,
    launch_context: Option<LaunchContext>,
    created_at: DateTime<Utc>,
}

impl UiInstance {
    /// Start an instance from the intent that launched it
    pub fn create(context: &PushContext, intent: &LaunchIntent) -> Result<Self, LifecycleError> {
        let channel = Arc::new(MethodChannel::new(BRIDGE_CHANNEL_NAME));
        let mut receiver = BridgeReceiver::new(channel.clone());
        receiver.attach(context.broadcaster())?;

        let resolver = context.resolver().clone();
        let launch_context = resolver.resolve(intent);

        let instance = Self {
            id: Uuid::new_v4(),
            channel,
            receiver,
            resolver,
            launch_context,
            created_at: Utc::now(),
        };

        tracing::info!(
            instance_id = %instance.id,
            from_notification = instance.launch_context.is_some(),
            "UI instance created"
        );

        Ok(instance)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Bind the UI runtime engine and hand back its end of the bridge
    pub fn configure_engine(&self, queue_capacity: usize) -> BridgeInbox {
        self.channel.configure_engine(queue_capacity)
    }

    /// Re-entry with a new intent while the instance is alive
    pub fn on_new_intent(&mut self, intent: &LaunchIntent) -> Option<&LaunchContext> {
        if let Some(context) = self.resolver.resolve(intent) {
            self.launch_context = Some(context);
            return self.launch_context.as_ref();
        }
        None
    }

    /// Context of the most recent notification tap, if any
    pub fn launch_context(&self) -> Option<&LaunchContext> {
        self.launch_context.as_ref()
    }

    /// Hand the launch context to the UI layer, clearing it
    pub fn take_launch_context(&mut self) -> Option<LaunchContext> {
        self.launch_context.take()
    }

    /// Answer a UI-to-native call
    pub fn handle_method_call(&self, call: &MethodCall) -> MethodResult {
        match call.method.as_str() {
            METHOD_IS_NOTIFICATION_SERVICE_RUNNING => MethodResult::Success(json!(self.receiver.is_attached())),
            other => {
                tracing::debug!(method = %other, "Unhandled bridge method");
                MethodResult::NotImplemented
            }
        }
    }

    pub fn is_attached(&self) -> bool {
        self.receiver.is_attached()
    }

    pub fn bridge_stats(&self) -> MethodChannelStats {
        self.channel.stats()
    }
}

impl Drop for UiInstance {
    fn drop(&mut self) {
        self.receiver.detach();
        tracing::info!(instance_id = %self.id, "UI instance destroyed");
    }
}
