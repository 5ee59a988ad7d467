//! Pluggable scoring strategies for the detail panel.
//!
//! The built-in strategies are deterministic heuristics over a record's own
//! fields. Anything implementing [`ScoringStrategy`] (a remote model, a
//! fixed table in tests) can be swapped in without touching the selection
//! controller.

use chrono::{DateTime, Utc};

use brokerdesk_entity::business::{Business, ListingStatus};
use brokerdesk_entity::lead::{Lead, LeadStatus};
use brokerdesk_entity::score::ScoreRecord;

/// Computes a score for one entity.
pub trait ScoringStrategy<T>: Send + Sync + std::fmt::Debug {
    /// Score `entity`. Every value in the result lies in `[0, 100]`.
    fn compute(&self, entity: &T) -> ScoreRecord;
}

/// Score of a record that loses two points per day of age.
fn recency(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - created_at).num_days().max(0) as f64;
    100.0 - days * 2.0
}

/// Percentage of present optional fields.
fn completeness(present: &[bool]) -> f64 {
    if present.is_empty() {
        return 0.0;
    }
    let filled = present.iter().filter(|p| **p).count() as f64;
    filled * 100.0 / present.len() as f64
}

/// Lead scoring by deal value, pipeline stage, age, and contact detail.
#[derive(Debug, Clone)]
pub struct LeadScoring {
    /// Estimated value that earns a full value score.
    pub value_ceiling: f64,
    /// Fixed "now" for age computation; the wall clock when `None`.
    pub reference: Option<DateTime<Utc>>,
}

impl Default for LeadScoring {
    fn default() -> Self {
        Self {
            value_ceiling: 1_000_000.0,
            reference: None,
        }
    }
}

impl LeadScoring {
    /// Score as of a fixed instant.
    pub fn at(reference: DateTime<Utc>) -> Self {
        Self {
            reference: Some(reference),
            ..Self::default()
        }
    }

    fn stage(status: LeadStatus) -> f64 {
        match status {
            LeadStatus::New => 25.0,
            LeadStatus::Contacted => 50.0,
            LeadStatus::Qualified => 85.0,
            LeadStatus::Closed => 100.0,
        }
    }
}

impl ScoringStrategy<Lead> for LeadScoring {
    fn compute(&self, lead: &Lead) -> ScoreRecord {
        let now = self.reference.unwrap_or_else(Utc::now);
        let value = if self.value_ceiling > 0.0 {
            lead.estimated_value * 100.0 / self.value_ceiling
        } else {
            0.0
        };
        let detail = completeness(&[
            lead.email.is_some(),
            lead.phone.is_some(),
            lead.company.is_some(),
            lead.source.is_some(),
            lead.notes.is_some(),
        ]);

        ScoreRecord::from_factors(
            lead.id.clone(),
            &[
                ("value", 0.35, value),
                ("stage", 0.30, Self::stage(lead.status)),
                ("recency", 0.15, recency(lead.created_at, now)),
                ("completeness", 0.20, detail),
            ],
        )
    }
}

/// Listing scoring by valuation, availability, age, and disclosure.
#[derive(Debug, Clone, Default)]
pub struct ListingScoring {
    /// Fixed "now" for age computation; the wall clock when `None`.
    pub reference: Option<DateTime<Utc>>,
}

impl ListingScoring {
    /// Score as of a fixed instant.
    pub fn at(reference: DateTime<Utc>) -> Self {
        Self {
            reference: Some(reference),
        }
    }

    /// Full marks up to a 3x revenue multiple, then 20 points off per turn.
    fn valuation(listing: &Business) -> f64 {
        match listing.revenue_multiple() {
            Some(multiple) if multiple <= 3.0 => 100.0,
            Some(multiple) => 100.0 - (multiple - 3.0) * 20.0,
            None => 40.0,
        }
    }
}

impl ScoringStrategy<Business> for ListingScoring {
    fn compute(&self, listing: &Business) -> ScoreRecord {
        let now = self.reference.unwrap_or_else(Utc::now);
        let availability = match listing.status {
            ListingStatus::Active => 100.0,
            ListingStatus::Pending => 60.0,
            ListingStatus::Sold => 20.0,
        };
        let disclosure = completeness(&[
            listing.description.is_some(),
            listing.annual_revenue.is_some(),
            listing.location.is_some(),
        ]);

        ScoreRecord::from_factors(
            listing.id.clone(),
            &[
                ("valuation", 0.40, Self::valuation(listing)),
                ("availability", 0.25, availability),
                ("recency", 0.15, recency(listing.created_at, now)),
                ("disclosure", 0.20, disclosure),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        "2026-03-01T00:00:00Z".parse().unwrap()
    }

    fn lead(status: &str, value: f64) -> Lead {
        serde_json::from_value(json!({
            "id": "l1",
            "user_id": "u1",
            "name": "Maria Rodriguez",
            "email": "maria@example.com",
            "status": status,
            "estimated_value": value,
            "created_at": "2026-02-20T00:00:00Z",
        }))
        .unwrap()
    }

    #[test]
    fn test_lead_scores_are_deterministic_and_bounded() {
        let scoring = LeadScoring::at(now());
        let a = scoring.compute(&lead("qualified", 5_000_000.0));
        let b = scoring.compute(&lead("qualified", 5_000_000.0));
        assert_eq!(a, b);
        assert!(a.score <= 100);
        assert_eq!(a.breakdown["value"], 100);
        assert_eq!(a.breakdown["recency"], 82);
    }

    #[test]
    fn test_later_stage_scores_higher() {
        let scoring = LeadScoring::at(now());
        let early = scoring.compute(&lead("new", 200_000.0));
        let late = scoring.compute(&lead("qualified", 200_000.0));
        assert!(late.score > early.score);
    }

    #[test]
    fn test_listing_valuation() {
        let listing: Business = serde_json::from_value(json!({
            "id": "b1",
            "seller_id": "s1",
            "name": "Corner Bakery",
            "industry": "restaurant",
            "status": "active",
            "asking_price": 1_000_000.0,
            "annual_revenue": 200_000.0,
            "created_at": "2026-03-01T00:00:00Z",
        }))
        .unwrap();
        let record = ListingScoring::at(now()).compute(&listing);
        assert_eq!(record.breakdown["valuation"], 60);
        assert_eq!(record.breakdown["availability"], 100);
        assert_eq!(record.breakdown["recency"], 100);
    }
}
