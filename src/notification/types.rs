use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Title used when a delivery carries none
pub const DEFAULT_TITLE: &str = "SustentaBag";
/// Body used when a delivery carries none
pub const DEFAULT_BODY: &str = "Nova notificação recebida";

/// Structured "notification" sub-payload of a push delivery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNotification {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// A push delivery as handed over by the messaging transport.
///
/// Either sub-payload may be missing. `data` values that are not strings are
/// stringified so a sloppy sender never causes a delivery to be rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPushPayload {
    /// Sender identifier reported by the transport
    #[serde(default)]
    pub from: Option<String>,
    /// Transport-assigned message id
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub notification: Option<RemoteNotification>,
    #[serde(default, deserialize_with = "lenient_string_map")]
    pub data: HashMap<String, String>,
}

impl RawPushPayload {
    /// Payload with only a structured notification part
    pub fn notification(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            notification: Some(RemoteNotification {
                title: Some(title.into()),
                body: Some(body.into()),
            }),
            ..Self::default()
        }
    }

    /// Payload with only a data part
    pub fn data<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            data: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }
}

fn lenient_string_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect())
}

/// Normalized message used everywhere after intake.
///
/// Title and body are never empty. Fields are private so a message cannot be
/// altered once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalMessage {
    id: Uuid,
    title: String,
    body: String,
    data: HashMap<String, String>,
    received_at: DateTime<Utc>,
}

impl CanonicalMessage {
    /// Build a message, substituting defaults for blank title or body
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        data: HashMap<String, String>,
    ) -> Self {
        let title = title.into();
        let body = body.into();
        Self {
            id: Uuid::new_v4(),
            title: first_present([Some(title.as_str())], DEFAULT_TITLE),
            body: first_present([Some(body.as_str())], DEFAULT_BODY),
            data,
            received_at: Utc::now(),
        }
    }

    /// Normalize a push delivery.
    ///
    /// Per field: the structured notification wins, then the `title`/`body`
    /// data keys, then the defaults. Blank values count as missing.
    pub fn from_payload(payload: &RawPushPayload) -> Self {
        let notification = payload.notification.as_ref();
        let title = first_present(
            [
                notification.and_then(|n| n.title.as_deref()),
                payload.data.get("title").map(String::as_str),
            ],
            DEFAULT_TITLE,
        );
        let body = first_present(
            [
                notification.and_then(|n| n.body.as_deref()),
                payload.data.get("body").map(String::as_str),
            ],
            DEFAULT_BODY,
        );

        Self {
            id: Uuid::new_v4(),
            title,
            body,
            data: payload.data.clone(),
            received_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn data(&self) -> &HashMap<String, String> {
        &self.data
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Receive time as epoch milliseconds
    pub fn received_at_millis(&self) -> i64 {
        self.received_at.timestamp_millis()
    }
}

fn first_present<const N: usize>(candidates: [Option<&str>; N], fallback: &str) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}
