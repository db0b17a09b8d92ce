use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::metrics::BridgeMetrics;

/// Name of the native/UI method channel
pub const BRIDGE_CHANNEL_NAME: &str = "com.example.sustenta_bag_application/fcm";

/// Method the UI runtime calls to check the service is up
pub const METHOD_IS_NOTIFICATION_SERVICE_RUNNING: &str = "isNotificationServiceRunning";
/// Method native code calls for each received message
pub const METHOD_ON_NOTIFICATION_RECEIVED: &str = "onNotificationReceived";

/// Arguments of `onNotificationReceived`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    /// Epoch millis
    pub timestamp: i64,
}

/// Native-to-UI calls. Fire and forget: no result is read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "arguments")]
pub enum BridgeCall {
    #[serde(rename = "onNotificationReceived")]
    OnNotificationReceived(NotificationPayload),
}

impl BridgeCall {
    pub fn method(&self) -> &'static str {
        match self {
            BridgeCall::OnNotificationReceived(_) => METHOD_ON_NOTIFICATION_RECEIVED,
        }
    }
}

/// UI-to-native call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: serde_json::Value::Null,
        }
    }
}

/// Answer to a UI-to-native call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum MethodResult {
    Success(serde_json::Value),
    NotImplemented,
}

/// Why a native-to-UI call was dropped
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    #[error("UI runtime engine is not configured")]
    NotInitialized,

    #[error("UI runtime call queue is full")]
    QueueFull,

    #[error("UI runtime stopped consuming calls")]
    Disconnected,
}

impl BridgeError {
    fn label(&self) -> &'static str {
        match self {
            BridgeError::NotInitialized => "not_initialized",
            BridgeError::QueueFull => "queue_full",
            BridgeError::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodChannelStats {
    pub forwarded: u64,
    pub dropped: u64,
    pub engine_configured: bool,
}

/// Native end of the method channel.
///
/// Calls go into a bounded queue that the UI runtime drains on its own event
/// loop. The sender never waits; when there is no consumer or the queue is
/// full the call is dropped.
pub struct MethodChannel {
    name: String,
    sender: RwLock<Option<mpsc::Sender<BridgeCall>>>,
    forwarded: AtomicU64,
    dropped: AtomicU64,
}

impl MethodChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sender: RwLock::new(None),
            forwarded: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind the UI runtime engine. Replaces any previous engine.
    pub fn configure_engine(&self, capacity: usize) -> BridgeInbox {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let mut sender = self.sender.write().unwrap_or_else(|e| e.into_inner());
        *sender = Some(tx);

        tracing::info!(channel = %self.name, capacity = capacity, "UI runtime engine configured");
        BridgeInbox { receiver: rx }
    }

    pub fn is_configured(&self) -> bool {
        self.sender
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Queue a call for the UI runtime without waiting
    pub fn invoke(&self, call: BridgeCall) -> Result<(), BridgeError> {
        let result = {
            let sender = self.sender.read().unwrap_or_else(|e| e.into_inner());
            match sender.as_ref() {
                None => Err(BridgeError::NotInitialized),
                Some(tx) => tx.try_send(call).map_err(|e| match e {
                    mpsc::error::TrySendError::Full(_) => BridgeError::QueueFull,
                    mpsc::error::TrySendError::Closed(_) => BridgeError::Disconnected,
                }),
            }
        };

        match result {
            Ok(()) => {
                self.forwarded.fetch_add(1, Ordering::Relaxed);
                BridgeMetrics::record_forwarded();
            }
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                BridgeMetrics::record_dropped(e.label());
                tracing::warn!(channel = %self.name, reason = %e, "Bridge call dropped");
            }
        }

        result
    }

    pub fn stats(&self) -> MethodChannelStats {
        MethodChannelStats {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            engine_configured: self.is_configured(),
        }
    }
}

/// UI runtime end of the method channel
pub struct BridgeInbox {
    receiver: mpsc::Receiver<BridgeCall>,
}

impl BridgeInbox {
    /// Next call, or `None` once every native sender is gone
    pub async fn recv(&mut self) -> Option<BridgeCall> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<BridgeCall> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(title: &str) -> BridgeCall {
        BridgeCall::OnNotificationReceived(NotificationPayload {
            title: title.to_string(),
            body: "body".to_string(),
            timestamp: 1_718_000_000_000,
        })
    }

    #[test]
    fn test_call_wire_format() {
        let json = serde_json::to_value(call("Oi")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "method": "onNotificationReceived",
                "arguments": {"title": "Oi", "body": "body", "timestamp": 1_718_000_000_000_i64}
            })
        );
    }

    #[test]
    fn test_invoke_before_engine_is_dropped() {
        let channel = MethodChannel::new(BRIDGE_CHANNEL_NAME);
        assert_eq!(channel.invoke(call("x")), Err(BridgeError::NotInitialized));
        assert_eq!(channel.stats().dropped, 1);
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let channel = MethodChannel::new(BRIDGE_CHANNEL_NAME);
        let mut inbox = channel.configure_engine(1);

        assert!(channel.invoke(call("first")).is_ok());
        assert_eq!(channel.invoke(call("second")), Err(BridgeError::QueueFull));

        assert_eq!(inbox.try_recv(), Some(call("first")));
        assert_eq!(inbox.try_recv(), None);
    }

    #[test]
    fn test_dropped_inbox_disconnects() {
        let channel = MethodChannel::new(BRIDGE_CHANNEL_NAME);
        let inbox = channel.configure_engine(4);
        assert!(channel.is_configured());

        drop(inbox);
        assert!(!channel.is_configured());
        assert_eq!(channel.invoke(call("x")), Err(BridgeError::Disconnected));
    }

    #[tokio::test]
    async fn test_reconfigured_engine_receives_calls() {
        let channel = MethodChannel::new(BRIDGE_CHANNEL_NAME);
        drop(channel.configure_engine(4));

        let mut inbox = channel.configure_engine(4);
        channel.invoke(call("again")).unwrap();
        assert_eq!(inbox.recv().await, Some(call("again")));
    }
}
