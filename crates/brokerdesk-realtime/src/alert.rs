//! Transient alerts raised for high-priority deliveries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use brokerdesk_entity::notification::NotificationPriority;
use brokerdesk_entity::record::Record;

/// A toast-style alert for a newly delivered record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    /// Collection the record arrived in.
    pub collection: &'static str,
    /// Id of the delivered record.
    pub id: String,
    /// Title (or name) of the record, when it has one.
    pub title: Option<String>,
    /// Priority that triggered the alert.
    pub priority: NotificationPriority,
    /// When the alert was raised.
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    /// Build an alert for `record` if its priority calls for one.
    pub fn for_record<T: Record>(record: &T) -> Option<Self> {
        let priority = record.priority();
        if !priority.raises_alert() {
            return None;
        }
        let title = record
            .field("title")
            .or_else(|| record.field("name"))
            .and_then(|v| v.as_text())
            .map(str::to_string);

        Some(Self {
            collection: T::COLLECTION,
            id: record.id().to_string(),
            title,
            priority,
            raised_at: Utc::now(),
        })
    }
}
