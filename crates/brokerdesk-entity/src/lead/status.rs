//! Lead pipeline stage enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stage of a lead in the sales pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    /// Just captured, nobody has reached out yet.
    New,
    /// An agent has made first contact.
    Contacted,
    /// Confirmed budget and intent.
    Qualified,
    /// Deal closed.
    Closed,
}

impl LeadStatus {
    /// All stages in pipeline order.
    pub const ALL: [LeadStatus; 4] = [Self::New, Self::Contacted, Self::Qualified, Self::Closed];

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Closed => "closed",
        }
    }

    /// Check if the lead has left the active pipeline.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = brokerdesk_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "qualified" => Ok(Self::Qualified),
            "closed" => Ok(Self::Closed),
            _ => Err(brokerdesk_core::AppError::validation(format!(
                "Invalid lead status: '{s}'. Expected one of: new, contacted, qualified, closed"
            ))),
        }
    }
}
