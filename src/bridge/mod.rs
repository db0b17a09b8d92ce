//! Native/UI runtime bridge.
//!
//! - `MethodChannel`: bounded, non-blocking call queue into the UI runtime
//! - `BridgeReceiver`: Detached/Attached subscriber that forwards broadcasts
//! - `UiInstance`: RAII owner tying the receiver to the UI lifecycle

mod method_channel;
mod receiver;
mod ui_instance;

pub use method_channel::{
    BridgeCall, BridgeError, BridgeInbox, MethodCall, MethodChannel, MethodChannelStats,
    MethodResult, NotificationPayload, BRIDGE_CHANNEL_NAME, METHOD_IS_NOTIFICATION_SERVICE_RUNNING,
    METHOD_ON_NOTIFICATION_RECEIVED,
};
pub use receiver::{BridgeReceiver, LifecycleError};
pub use ui_instance::UiInstance;
