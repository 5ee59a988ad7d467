//! Listing industry and status enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Industry a listed business operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    /// Restaurants, cafes, bars.
    Restaurant,
    /// Retail stores.
    Retail,
    /// Service businesses.
    Service,
    /// Manufacturing.
    Manufacturing,
    /// Technology companies.
    Technology,
    /// Healthcare practices.
    Healthcare,
    /// Anything else.
    Other,
}

impl Industry {
    /// Return the industry as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Restaurant => "restaurant",
            Self::Retail => "retail",
            Self::Service => "service",
            Self::Manufacturing => "manufacturing",
            Self::Technology => "technology",
            Self::Healthcare => "healthcare",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Market status of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    /// Open to offers.
    Active,
    /// Under contract.
    Pending,
    /// Sold.
    Sold,
}

impl ListingStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Sold => "sold",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
