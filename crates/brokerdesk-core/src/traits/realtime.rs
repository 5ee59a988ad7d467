//! Realtime change-subscription trait.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::result::AppResult;

/// Opaque identifier of an open subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// An open subscription.
///
/// `events` yields raw change payloads (JSON text). The channel closing
/// means the underlying connection was lost.
#[derive(Debug)]
pub struct Subscription {
    /// Handle used to unsubscribe.
    pub handle: SubscriptionHandle,
    /// Raw inbound change payloads.
    pub events: mpsc::Receiver<String>,
}

/// Trait for push-channel backends.
#[async_trait]
pub trait RealtimeSource: Send + Sync + std::fmt::Debug + 'static {
    /// Subscribe to changes of `collection` matching a `field=op.value`
    /// filter expression.
    async fn subscribe(&self, collection: &str, filter: &str) -> AppResult<Subscription>;

    /// Close a subscription. Unknown handles are ignored.
    async fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// Kind of row change carried by a realtime event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

/// Wire shape of a realtime change event.
///
/// Accepts both the camelCase form (`eventType`/`newRow`) and the hosted
/// backend's native form (`type`/`record`/`old_record`).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChangeEvent {
    /// What happened to the row.
    #[serde(rename = "eventType", alias = "event_type", alias = "type")]
    pub event_type: ChangeKind,
    /// Row after the change (absent for deletes).
    #[serde(rename = "newRow", alias = "new_row", alias = "record", default)]
    pub new_row: Option<crate::traits::gateway::Row>,
    /// Row before the change, when the backend provides it.
    #[serde(rename = "oldRow", alias = "old_row", alias = "old_record", default)]
    pub old_row: Option<crate::traits::gateway::Row>,
}

impl ChangeEvent {
    /// Build an event.
    pub fn new(
        event_type: ChangeKind,
        new_row: Option<crate::traits::gateway::Row>,
        old_row: Option<crate::traits::gateway::Row>,
    ) -> Self {
        Self {
            event_type,
            new_row,
            old_row,
        }
    }

    /// Encode as JSON text for a subscription channel.
    pub fn to_payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_native_field_names() {
        let event: ChangeEvent = serde_json::from_str(
            r#"{"type": "INSERT", "record": {"id": "n1"}, "old_record": {}}"#,
        )
        .expect("decode");
        assert_eq!(event.event_type, ChangeKind::Insert);
        assert_eq!(event.new_row, Some(serde_json::json!({"id": "n1"})));
    }

    #[test]
    fn test_payload_uses_camel_case() {
        let payload = ChangeEvent::new(ChangeKind::Delete, None, Some(serde_json::json!({"id": "1"})))
            .to_payload();
        assert!(payload.contains("\"eventType\":\"DELETE\""));
        assert!(payload.contains("\"oldRow\""));
    }
}
