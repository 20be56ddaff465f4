//! Registry change notification payload.

use serde::{Deserialize, Serialize};

/// Registry lifecycle action reported by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventAction {
    /// New content was pushed.
    Insert,
    /// Content was deleted.
    Delete,
    /// Any action this receiver does not recognise, or no action at all.
    #[default]
    #[serde(other)]
    Other,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Insert => "INSERT",
            Self::Delete => "DELETE",
            Self::Other => "OTHER",
        };
        write!(f, "{s}")
    }
}

/// Decoded registry notification.
///
/// Constructed once per inbound request and never mutated. At least one of
/// `digest` and `tag` is present on an actionable event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(default)]
    pub action: EventAction,

    /// Digest reference (`host/path@sha256:<hex>`) of the affected artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Tag reference (`host/path:<label>`) of the affected artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl NotificationEvent {
    /// Returns `digest`, treating an empty string as absent.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref().filter(|d| !d.is_empty())
    }

    /// Returns `tag`, treating an empty string as absent.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref().filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_and_unknown_actions() {
        let event: NotificationEvent =
            serde_json::from_str(r#"{"action":"INSERT","digest":"h/r@sha256:ab"}"#).unwrap();
        assert_eq!(event.action, EventAction::Insert);
        assert_eq!(event.digest(), Some("h/r@sha256:ab"));
        assert_eq!(event.tag(), None);

        let event: NotificationEvent =
            serde_json::from_str(r#"{"action":"UPDATE","tag":"h/r:1"}"#).unwrap();
        assert_eq!(event.action, EventAction::Other);

        let event: NotificationEvent = serde_json::from_str("{}").unwrap();
        assert_eq!(event.action, EventAction::Other);
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let event = NotificationEvent {
            action: EventAction::Insert,
            digest: Some(String::new()),
            tag: Some(String::new()),
        };
        assert_eq!(event.digest(), None);
        assert_eq!(event.tag(), None);
    }
}
