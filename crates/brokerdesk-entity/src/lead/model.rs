//! Lead entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brokerdesk_core::result::AppResult;

use crate::record::{FieldValue, Record, ensure_money};

use super::status::LeadStatus;

/// A prospective buyer or seller tracked in an agent's pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Unique lead identifier.
    pub id: String,
    /// The agent who owns this lead.
    pub user_id: String,
    /// Contact name.
    pub name: String,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Contact phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Company the contact represents.
    #[serde(default)]
    pub company: Option<String>,
    /// Where the lead came from (website, referral, open house, ...).
    #[serde(default)]
    pub source: Option<String>,
    /// Pipeline stage.
    pub status: LeadStatus,
    /// Estimated deal value.
    #[serde(default)]
    pub estimated_value: f64,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// When the lead was captured.
    pub created_at: DateTime<Utc>,
    /// When the lead was last edited.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Lead {
    const COLLECTION: &'static str = "leads";

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
            "name" => Some(FieldValue::Text(&self.name)),
            "email" => self.email.as_deref().map(FieldValue::Text),
            "phone" => self.phone.as_deref().map(FieldValue::Text),
            "company" => self.company.as_deref().map(FieldValue::Text),
            "source" => self.source.as_deref().map(FieldValue::Category),
            "status" => Some(FieldValue::Category(self.status.as_str())),
            "estimated_value" => Some(FieldValue::Number(self.estimated_value)),
            "notes" => self.notes.as_deref().map(FieldValue::Text),
            "created_at" => Some(FieldValue::Timestamp(self.created_at)),
            _ => None,
        }
    }

    fn check(&self) -> AppResult<()> {
        ensure_money("estimated_value", self.estimated_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_minimal_row() {
        let lead: Lead = serde_json::from_value(serde_json::json!({
            "id": "1",
            "user_id": "agent-1",
            "name": "Maria Rodriguez",
            "status": "new",
            "created_at": "2026-01-05T10:00:00Z"
        }))
        .expect("decode");
        assert_eq!(lead.status, LeadStatus::New);
        assert_eq!(lead.estimated_value, 0.0);
        assert!(lead.field("email").is_none());
        assert_eq!(lead.field("status"), Some(FieldValue::Category("new")));
    }

    #[test]
    fn test_rejects_unknown_status() {
        let result = serde_json::from_value::<Lead>(serde_json::json!({
            "id": "1",
            "user_id": "agent-1",
            "name": "x",
            "status": "lost",
            "created_at": "2026-01-05T10:00:00Z"
        }));
        assert!(result.is_err());
        assert!("lost".parse::<LeadStatus>().is_err());
        assert_eq!("Qualified".parse::<LeadStatus>().ok(), Some(LeadStatus::Qualified));
    }

    #[test]
    fn test_negative_value_fails_check() {
        let lead = Lead {
            id: "1".into(),
            user_id: "a".into(),
            name: "x".into(),
            email: None,
            phone: None,
            company: None,
            source: None,
            status: LeadStatus::New,
            estimated_value: -5.0,
            notes: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        assert!(lead.check().is_err());
    }
}
