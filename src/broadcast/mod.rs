//! Intra-process broadcast of received messages.
//!
//! Replaces an OS-level app-private broadcast with a typed bus. Registration
//! is access controlled (`ReceiverScope::NotExported` only) and returns an
//! RAII `BroadcastSubscription`.

mod registry;
mod types;

pub use registry::{BroadcastSubscription, Broadcaster};
pub use types::{
    BroadcastEnvelope, BroadcastError, BroadcastReceiver, BroadcastStatsSnapshot, ReceiverScope,
    NOTIFICATION_RECEIVED_SUFFIX,
};
