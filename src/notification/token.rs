use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::metrics::IntakeMetrics;

/// Latest registration token issued by the messaging provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationToken {
    pub token: String,
    pub refreshed_at: DateTime<Utc>,
}

/// Holds the most recent token for the registration flow.
///
/// Backed by a watch channel so a consumer can await refreshes instead of
/// polling.
pub struct TokenStore {
    tx: watch::Sender<Option<RegistrationToken>>,
}

impl TokenStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Record a refreshed token. Blank tokens are ignored.
    pub fn record(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            tracing::warn!("Ignoring blank registration token");
            return false;
        }

        self.tx.send_replace(Some(RegistrationToken {
            token: token.to_string(),
            refreshed_at: Utc::now(),
        }));
        IntakeMetrics::record_token_refreshed();
        tracing::info!(token_len = token.len(), "Registration token refreshed");
        true
    }

    pub fn current(&self) -> Option<RegistrationToken> {
        self.tx.borrow().clone()
    }

    /// Watch for future refreshes
    pub fn subscribe(&self) -> watch::Receiver<Option<RegistrationToken>> {
        self.tx.subscribe()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}
