//! Business listing entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use brokerdesk_core::result::AppResult;

use crate::record::{FieldValue, Record, ensure_money};

use super::kind::{Industry, ListingStatus};

/// A business offered for sale through the brokerage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    /// Unique listing identifier.
    pub id: String,
    /// The seller who owns the listing.
    pub seller_id: String,
    /// Business name.
    pub name: String,
    /// Listing description.
    #[serde(default)]
    pub description: Option<String>,
    /// Industry.
    pub industry: Industry,
    /// Market status.
    pub status: ListingStatus,
    /// Asking price.
    pub asking_price: f64,
    /// Reported annual revenue.
    #[serde(default)]
    pub annual_revenue: Option<f64>,
    /// City / region.
    #[serde(default)]
    pub location: Option<String>,
    /// When the listing was created.
    pub created_at: DateTime<Utc>,
}

impl Business {
    /// Asking price as a multiple of annual revenue, if revenue is known.
    pub fn revenue_multiple(&self) -> Option<f64> {
        self.annual_revenue
            .filter(|revenue| *revenue > 0.0)
            .map(|revenue| self.asking_price / revenue)
    }
}

impl Record for Business {
    const COLLECTION: &'static str = "businesses";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Text(&self.id)),
            "seller_id" => Some(FieldValue::Category(&self.seller_id)),
            "name" => Some(FieldValue::Text(&self.name)),
            "description" => self.description.as_deref().map(FieldValue::Text),
            "industry" => Some(FieldValue::Category(self.industry.as_str())),
            "status" => Some(FieldValue::Category(self.status.as_str())),
            "asking_price" => Some(FieldValue::Number(self.asking_price)),
            "annual_revenue" => self.annual_revenue.map(FieldValue::Number),
            "location" => self.location.as_deref().map(FieldValue::Text),
            "created_at" => Some(FieldValue::Timestamp(self.created_at)),
            _ => None,
        }
    }

    fn check(&self) -> AppResult<()> {
        ensure_money("asking_price", self.asking_price)?;
        if let Some(revenue) = self.annual_revenue {
            ensure_money("annual_revenue", revenue)?;
        }
        Ok(())
    }
}
