//! Hosts the simulated UI runtime.
//!
//! At most one `UiInstance` is alive at a time. Each instance gets an event
//! loop task that drains its bridge inbox the way the UI runtime would; the
//! loop ends on its own once the instance is destroyed and every sender of
//! the method channel is gone.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::bridge::{
    BridgeCall, BridgeInbox, LifecycleError, MethodCall, MethodChannelStats, MethodResult,
    NotificationPayload, UiInstance,
};
use crate::context::PushContext;
use crate::error::AppError;
use crate::notification::{LaunchContext, LaunchIntent};

/// Notifications kept for status reporting
const RECENT_NOTIFICATIONS_LIMIT: usize = 20;

/// Time allowed for the event loop to drain after its instance is destroyed
const EVENT_LOOP_STOP_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("UI instance {0} is already running")]
    AlreadyRunning(Uuid),

    #[error("no UI instance is running")]
    NotRunning,

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl From<HostError> for AppError {
    fn from(e: HostError) -> Self {
        let message = e.to_string();
        match e {
            HostError::AlreadyRunning(_) => AppError::Conflict(message),
            HostError::NotRunning => AppError::NotFound(message),
            HostError::Lifecycle(_) => AppError::Internal(message),
        }
    }
}

/// What the UI runtime side has seen across instances
#[derive(Debug, Default)]
struct UiRuntimeLog {
    calls_received: AtomicU64,
    recent: RwLock<VecDeque<NotificationPayload>>,
}

impl UiRuntimeLog {
    async fn record(&self, payload: NotificationPayload) {
        self.calls_received.fetch_add(1, Ordering::Relaxed);
        let mut recent = self.recent.write().await;
        if recent.len() == RECENT_NOTIFICATIONS_LIMIT {
            recent.pop_front();
        }
        recent.push_back(payload);
    }
}

struct RunningUi {
    instance: UiInstance,
    event_loop: JoinHandle<()>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiStatus {
    pub running: bool,
    pub instance_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub attached: bool,
    pub launch_context: Option<LaunchContext>,
    pub bridge: Option<MethodChannelStats>,
    pub calls_received: u64,
    /// Oldest first
    pub recent_notifications: Vec<NotificationPayload>,
}

pub struct UiHost {
    context: Arc<PushContext>,
    queue_capacity: usize,
    running: Mutex<Option<RunningUi>>,
    log: Arc<UiRuntimeLog>,
}

impl UiHost {
    pub fn new(context: Arc<PushContext>, queue_capacity: usize) -> Self {
        Self {
            context,
            queue_capacity,
            running: Mutex::new(None),
            log: Arc::new(UiRuntimeLog::default()),
        }
    }

    /// Cold start from `intent`. Refused while an instance is alive.
    pub async fn start(&self, intent: &LaunchIntent) -> Result<UiStatus, HostError> {
        let mut running = self.running.lock().await;
        if let Some(current) = running.as_ref() {
            return Err(HostError::AlreadyRunning(current.instance.id()));
        }

        *running = Some(self.launch(intent)?);
        drop(running);
        Ok(self.status().await)
    }

    /// Route an intent the way the OS would: to the live instance when there
    /// is one, otherwise through a cold start.
    pub async fn deliver_intent(&self, intent: &LaunchIntent) -> Result<UiStatus, HostError> {
        let mut running = self.running.lock().await;
        match running.as_mut() {
            Some(current) => {
                current.instance.on_new_intent(intent);
            }
            None => {
                *running = Some(self.launch(intent)?);
            }
        }
        drop(running);
        Ok(self.status().await)
    }

    /// Destroy the live instance and wait for its event loop to drain
    pub async fn stop(&self) -> Result<(), HostError> {
        let RunningUi {
            instance,
            event_loop,
        } = self.running.lock().await.take().ok_or(HostError::NotRunning)?;

        let instance_id = instance.id();
        drop(instance);

        match tokio::time::timeout(Duration::from_millis(EVENT_LOOP_STOP_TIMEOUT_MS), event_loop).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(instance_id = %instance_id, error = %e, "UI event loop panicked"),
            Err(_) => tracing::warn!(instance_id = %instance_id, "UI event loop did not stop in time"),
        }
        Ok(())
    }

    /// Forward a UI-to-native call to the live instance
    pub async fn call_method(&self, call: &MethodCall) -> Result<MethodResult, HostError> {
        let running = self.running.lock().await;
        let current = running.as_ref().ok_or(HostError::NotRunning)?;
        Ok(current.instance.handle_method_call(call))
    }

    /// Hand the pending launch context to the UI layer
    pub async fn take_launch_context(&self) -> Result<Option<LaunchContext>, HostError> {
        let mut running = self.running.lock().await;
        let current = running.as_mut().ok_or(HostError::NotRunning)?;
        Ok(current.instance.take_launch_context())
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    pub async fn status(&self) -> UiStatus {
        let recent_notifications = self.log.recent.read().await.iter().cloned().collect();
        let calls_received = self.log.calls_received.load(Ordering::Relaxed);

        let running = self.running.lock().await;
        match running.as_ref() {
            Some(current) => UiStatus {
                running: true,
                instance_id: Some(current.instance.id()),
                started_at: Some(current.instance.created_at()),
                attached: current.instance.is_attached(),
                launch_context: current.instance.launch_context().cloned(),
                bridge: Some(current.instance.bridge_stats()),
                calls_received,
                recent_notifications,
            },
            None => UiStatus {
                running: false,
                instance_id: None,
                started_at: None,
                attached: false,
                launch_context: None,
                bridge: None,
                calls_received,
                recent_notifications,
            },
        }
    }

    fn launch(&self, intent: &LaunchIntent) -> Result<RunningUi, HostError> {
        let instance = UiInstance::create(&self.context, intent)?;
        let inbox = instance.configure_engine(self.queue_capacity);
        let event_loop = tokio::spawn(run_event_loop(instance.id(), inbox, self.log.clone()));
        Ok(RunningUi {
            instance,
            event_loop,
        })
    }
}

async fn run_event_loop(instance_id: Uuid, mut inbox: BridgeInbox, log: Arc<UiRuntimeLog>) {
    tracing::debug!(instance_id = %instance_id, "UI event loop started");

    while let Some(call) = inbox.recv().await {
        match call {
            BridgeCall::OnNotificationReceived(payload) => {
                tracing::info!(
                    instance_id = %instance_id,
                    title = %payload.title,
                    body = %payload.body,
                    timestamp = payload.timestamp,
                    "UI received notification"
                );
                log.record(payload).await;
            }
        }
    }

    tracing::debug!(instance_id = %instance_id, "UI event loop stopped");
}
