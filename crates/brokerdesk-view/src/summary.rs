//! Pipeline summary for the lead dashboard.

use std::collections::BTreeMap;

use serde::Serialize;

use brokerdesk_entity::lead::{Lead, LeadStatus};

use crate::scoring::ScoringStrategy;

/// Aggregate figures over a set of leads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSummary {
    /// Number of leads.
    pub total: usize,
    /// Lead count per status, every status present.
    pub by_status: BTreeMap<String, usize>,
    /// Sum of estimated values.
    pub total_value: f64,
    /// Mean estimated value (0 for an empty pipeline).
    pub average_value: f64,
    /// Share of leads that are closed, in `[0, 1]`.
    pub conversion_rate: f64,
    /// Mean lead score, if there are leads.
    pub average_score: Option<f64>,
}

impl PipelineSummary {
    /// Summarize `leads`, scoring each with `scoring`.
    pub fn from_leads(leads: &[Lead], scoring: &dyn ScoringStrategy<Lead>) -> Self {
        let mut by_status: BTreeMap<String, usize> = LeadStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for lead in leads {
            *by_status.entry(lead.status.as_str().to_string()).or_default() += 1;
        }

        let total = leads.len();
        let total_value: f64 = leads.iter().map(|l| l.estimated_value).sum();
        let closed = by_status.get(LeadStatus::Closed.as_str()).copied().unwrap_or(0);

        let (average_value, conversion_rate, average_score) = if total == 0 {
            (0.0, 0.0, None)
        } else {
            let scores: u32 = leads
                .iter()
                .map(|l| u32::from(scoring.compute(l).score))
                .sum();
            (
                total_value / total as f64,
                closed as f64 / total as f64,
                Some(f64::from(scores) / total as f64),
            )
        };

        Self {
            total,
            by_status,
            total_value,
            average_value,
            conversion_rate,
            average_score,
        }
    }
}
