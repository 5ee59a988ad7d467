//! Client-derived score records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Highest possible score.
pub const MAX_SCORE: u8 = 100;

/// A derived score for one entity, with its named sub-factors.
///
/// Every value lies in `[0, 100]`. Scores are computed on the client and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// The scored entity.
    pub entity_id: String,
    /// Overall score.
    pub score: u8,
    /// Sub-factor name → sub-score.
    pub breakdown: BTreeMap<String, u8>,
}

impl ScoreRecord {
    /// Build a record from `(factor, weight, value)` triples.
    ///
    /// Values are clamped to `[0, 100]`; the overall score is the weighted
    /// mean. Non-positive weights are ignored.
    pub fn from_factors(entity_id: impl Into<String>, factors: &[(&str, f64, f64)]) -> Self {
        let mut breakdown = BTreeMap::new();
        let mut weighted = 0.0;
        let mut total_weight = 0.0;

        for (name, weight, value) in factors {
            let value = clamp_score(*value);
            breakdown.insert((*name).to_string(), value);
            if *weight > 0.0 {
                weighted += weight * f64::from(value);
                total_weight += weight;
            }
        }

        let score = if total_weight > 0.0 {
            clamp_score(weighted / total_weight)
        } else {
            0
        };

        Self {
            entity_id: entity_id.into(),
            score,
            breakdown,
        }
    }
}

fn clamp_score(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, f64::from(MAX_SCORE)) as u8
}
