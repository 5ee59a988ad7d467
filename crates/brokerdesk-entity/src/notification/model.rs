//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{FieldValue, Record};

use super::kind::NotificationType;
use super::priority::NotificationPriority;

/// A notification delivered to a user's inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: String,
    /// The recipient user.
    pub user_id: String,
    /// Visual tone.
    #[serde(rename = "type", default)]
    pub notification_type: NotificationType,
    /// Priority level.
    #[serde(default)]
    pub priority: NotificationPriority,
    /// Notification title.
    pub title: String,
    /// Notification body text.
    #[serde(default)]
    pub message: String,
    /// In-app link the notification points to.
    #[serde(default)]
    pub link: Option<String>,
    /// Whether the user has read this notification.
    #[serde(default)]
    pub is_read: bool,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Check if the notification has been read.
    pub fn is_unread(&self) -> bool {
        !self.is_read
    }
}

impl Record for Notification {
    const COLLECTION: &'static str = "notifications";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Text(&self.id)),
            "user_id" => Some(FieldValue::Category(&self.user_id)),
            "type" => Some(FieldValue::Category(self.notification_type.as_str())),
            "priority" => Some(FieldValue::Category(self.priority.as_str())),
            "title" => Some(FieldValue::Text(&self.title)),
            "message" => Some(FieldValue::Text(&self.message)),
            "is_read" => Some(FieldValue::Flag(self.is_read)),
            "created_at" => Some(FieldValue::Timestamp(self.created_at)),
            _ => None,
        }
    }

    fn priority(&self) -> NotificationPriority {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_decoding() {
        let n: Notification = serde_json::from_value(serde_json::json!({
            "id": "n1",
            "user_id": "u1",
            "title": "Offer received",
            "created_at": "2026-03-01T08:00:00Z"
        }))
        .expect("decode");
        assert!(n.is_unread());
        assert_eq!(n.priority, NotificationPriority::Normal);
        assert_eq!(n.notification_type, NotificationType::Info);
        assert_eq!(n.field("is_read"), Some(FieldValue::Flag(false)));
    }
}
