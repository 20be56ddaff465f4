//! Push-notification envelope decoding.
//!
//! The messaging platform delivers each registry notification as an HTTP
//! POST whose body is a push envelope:
//!
//! ```json
//! {
//!   "message": {
//!     "data": "<base64 of the notification JSON>",
//!     "attributes": {},
//!     "messageId": "123",
//!     "publishTime": "2026-01-01T00:00:00Z"
//!   },
//!   "subscription": "projects/p/subscriptions/s"
//! }
//! ```
//!
//! `data` may also be the notification JSON itself, and a body without an
//! envelope is accepted as a bare notification.

use std::collections::BTreeMap;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validation::{NotificationEvent, RequestError};

/// Push envelope as delivered by the messaging platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
}

/// The message inside a [`PushEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<DateTime<Utc>>,
}

impl PushEnvelope {
    /// Wraps `payload` (notification JSON text) the way the messaging
    /// platform does: base64 `data` inside a message.
    pub fn wrap(subscription: impl Into<String>, payload: &str) -> Self {
        Self {
            message: PushMessage {
                data: Some(base64::engine::general_purpose::STANDARD.encode(payload)),
                ..PushMessage::default()
            },
            subscription: Some(subscription.into()),
        }
    }
}

/// A decoded notification plus the delivery metadata worth logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub event: NotificationEvent,
    pub message_id: Option<String>,
    pub publish_time: Option<DateTime<Utc>>,
    pub subscription: Option<String>,
}

impl From<NotificationEvent> for Notification {
    fn from(event: NotificationEvent) -> Self {
        Self {
            event,
            message_id: None,
            publish_time: None,
            subscription: None,
        }
    }
}

/// Decodes an intake request body into a [`Notification`].
///
/// # Errors
///
/// [`RequestError::InvalidNotification`] if the body is not JSON, the
/// envelope has no `data`, `data` is neither base64 nor JSON, or the payload
/// is not a notification object.
pub fn decode_notification(body: &[u8]) -> Result<Notification, RequestError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| invalid(format!("body is not JSON: {e}")))?;

    if value.get("message").is_none() {
        let event: NotificationEvent = serde_json::from_value(value)
            .map_err(|e| invalid(format!("body is not a notification: {e}")))?;
        return Ok(event.into());
    }

    let envelope: PushEnvelope = serde_json::from_value(value)
        .map_err(|e| invalid(format!("malformed push envelope: {e}")))?;
    let data = envelope
        .message
        .data
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| invalid("push message has no data".to_string()))?;

    Ok(Notification {
        event: decode_data(data)?,
        message_id: envelope.message.message_id,
        publish_time: envelope.message.publish_time,
        subscription: envelope.subscription,
    })
}

fn decode_data(data: &str) -> Result<NotificationEvent, RequestError> {
    let trimmed = data.trim();
    let payload = if trimmed.starts_with('{') {
        trimmed.as_bytes().to_vec()
    } else {
        base64::engine::general_purpose::STANDARD
            .decode(trimmed)
            .map_err(|e| invalid(format!("message data is not base64: {e}")))?
    };
    serde_json::from_slice(&payload)
        .map_err(|e| invalid(format!("message data is not a notification: {e}")))
}

fn invalid(reason: String) -> RequestError {
    RequestError::InvalidNotification { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validation::EventAction;

    const EVENT: &str = r#"{
        "action": "INSERT",
        "digest": "us-east1-docker.pkg.dev/my-project/my-repo/hello-world@sha256:6ec128e26cd5"
    }"#;

    #[test]
    fn decodes_base64_envelope() {
        let body = serde_json::to_vec(&PushEnvelope::wrap("test", EVENT)).unwrap();
        let notification = decode_notification(&body).unwrap();
        assert_eq!(notification.event.action, EventAction::Insert);
        assert_eq!(
            notification.event.digest(),
            Some("us-east1-docker.pkg.dev/my-project/my-repo/hello-world@sha256:6ec128e26cd5")
        );
        assert_eq!(notification.subscription.as_deref(), Some("test"));
    }

    #[test]
    fn decodes_envelope_metadata() {
        let body = serde_json::json!({
            "message": {
                "data": base64::engine::general_purpose::STANDARD.encode(EVENT),
                "messageId": "136969346945",
                "message_id": "136969346945",
                "publishTime": "2026-01-02T03:04:05Z",
                "attributes": {"origin": "registry"}
            },
            "subscription": "projects/p/subscriptions/s"
        });
        let notification = decode_notification(body.to_string().as_bytes()).unwrap();
        assert_eq!(notification.message_id.as_deref(), Some("136969346945"));
        assert_eq!(
            notification.publish_time.map(|t| t.to_rfc3339()),
            Some("2026-01-02T03:04:05+00:00".to_string())
        );
    }

    #[test]
    fn decodes_plain_json_data() {
        let body = serde_json::json!({ "message": { "data": EVENT } });
        let notification = decode_notification(body.to_string().as_bytes()).unwrap();
        assert_eq!(notification.event.action, EventAction::Insert);
    }

    #[test]
    fn decodes_bare_notification() {
        let notification = decode_notification(br#"{"action":"DELETE","tag":"h/r:1.1"}"#).unwrap();
        assert_eq!(notification.event.action, EventAction::Delete);
        assert!(notification.message_id.is_none());
    }

    #[test]
    fn rejects_malformed_bodies() {
        let bodies: [&[u8]; 6] = [
            b"not json",
            br#"{"message":{}}"#,
            br#"{"message":{"data":""}}"#,
            br#"{"message":{"data":"!!!not-base64!!!"}}"#,
            br#"{"message":{"data":"bm90IGpzb24="}}"#,
            br#""a string""#,
        ];
        for body in bodies {
            let err = decode_notification(body).unwrap_err();
            assert!(
                matches!(err, RequestError::InvalidNotification { .. }),
                "{}",
                String::from_utf8_lossy(body)
            );
        }
    }
}
