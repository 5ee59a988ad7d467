//! Agent entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::{FieldValue, Record};

/// Practice area of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentSpecialty {
    /// Homes and condos.
    Residential,
    /// Office, retail, and industrial property.
    Commercial,
    /// Buying and selling operating businesses.
    BusinessBrokerage,
}

impl AgentSpecialty {
    /// Return the specialty as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Residential => "residential",
            Self::Commercial => "commercial",
            Self::BusinessBrokerage => "business_brokerage",
        }
    }
}

impl fmt::Display for AgentSpecialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A brokerage agent listed in the public directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent identifier.
    pub id: String,
    /// Full name.
    pub name: String,
    /// Job title.
    #[serde(default)]
    pub title: Option<String>,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Office the agent works from.
    #[serde(default)]
    pub office: Option<String>,
    /// Practice area.
    pub specialty: AgentSpecialty,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
}

impl Record for Agent {
    const COLLECTION: &'static str = "agents";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Text(&self.id)),
            "name" => Some(FieldValue::Text(&self.name)),
            "title" => self.title.as_deref().map(FieldValue::Text),
            "email" => self.email.as_deref().map(FieldValue::Text),
            "phone" => self.phone.as_deref().map(FieldValue::Text),
            "office" => self.office.as_deref().map(FieldValue::Text),
            "specialty" => Some(FieldValue::Category(self.specialty.as_str())),
            "created_at" => Some(FieldValue::Timestamp(self.created_at)),
            _ => None,
        }
    }
}
