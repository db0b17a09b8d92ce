use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notification::CanonicalMessage;

/// Suffix of the private action, appended to the package name
pub const NOTIFICATION_RECEIVED_SUFFIX: &str = "NOTIFICATION_RECEIVED";

/// Who may address a receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiverScope {
    /// Only components of this application
    NotExported,
    /// Any application on the device
    Exported,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BroadcastError {
    #[error("receivers for {action} must not be exported")]
    ExportedReceiver { action: String },
}

/// What subscribers receive for each published message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastEnvelope {
    pub action: String,
    pub package: String,
    pub title: String,
    pub body: String,
    /// Publish time in epoch millis, never earlier than the message's receive time
    pub timestamp: i64,
}

impl BroadcastEnvelope {
    pub(crate) fn for_message(
        action: &str,
        package: &str,
        message: &CanonicalMessage,
        now_millis: i64,
    ) -> Self {
        Self {
            action: action.to_string(),
            package: package.to_string(),
            title: message.title().to_string(),
            body: message.body().to_string(),
            timestamp: now_millis.max(message.received_at_millis()),
        }
    }
}

/// Subscriber side of the broadcaster.
///
/// Called while the broadcaster holds its registry lock, so implementations
/// must not block and must not subscribe or unsubscribe from inside
/// `on_receive`.
pub trait BroadcastReceiver: Send + Sync {
    /// Handle one envelope. Returns whether it was accepted.
    fn on_receive(&self, envelope: &BroadcastEnvelope) -> bool;
}

/// Snapshot of broadcaster statistics
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastStatsSnapshot {
    pub published: u64,
    pub delivered: u64,
    pub rejected: u64,
    pub unobserved: u64,
    pub active_subscribers: usize,
}
