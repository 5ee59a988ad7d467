//! Favorite relation between a user and an entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's bookmark on an entity. Existence is the whole payload.
///
/// At most one relation exists per (user, entity) pair: the row id is
/// derived from the pair, so repeated writes collapse onto the same row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRelation {
    /// Deterministic relation id (see [`FavoriteRelation::relation_id`]).
    pub id: String,
    /// The user who favorited.
    pub user_id: String,
    /// Collection of the favorited entity.
    pub entity_type: String,
    /// The favorited entity.
    pub entity_id: String,
    /// When the favorite was created.
    pub created_at: DateTime<Utc>,
}

impl FavoriteRelation {
    /// Backend collection holding favorite relations.
    pub const COLLECTION: &'static str = "favorites";

    /// Create a new relation stamped with the current time.
    pub fn new(user_id: &str, entity_type: &str, entity_id: &str) -> Self {
        Self {
            id: Self::relation_id(user_id, entity_type, entity_id),
            user_id: user_id.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Row id for the (user, entity) pair.
    pub fn relation_id(user_id: &str, entity_type: &str, entity_id: &str) -> String {
        format!("{user_id}:{entity_type}:{entity_id}")
    }
}
