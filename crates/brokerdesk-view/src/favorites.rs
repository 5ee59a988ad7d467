//! The signed-in user's favorites of one entity kind.

use std::collections::BTreeSet;
use std::sync::RwLock;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use brokerdesk_core::result::AppResult;
use brokerdesk_core::traits::gateway::DataGateway;
use brokerdesk_core::types::query::Query;
use brokerdesk_entity::favorite::FavoriteRelation;

use crate::session::Session;

/// A favorite flag changed locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteChange {
    /// The entity whose flag changed.
    pub entity_id: String,
    /// Whether it is now a favorite.
    pub favorite: bool,
}

/// Local set of favorited entity ids.
#[derive(Debug)]
pub struct FavoriteSet {
    user_id: String,
    entity_type: String,
    ids: RwLock<BTreeSet<String>>,
    changes: broadcast::Sender<FavoriteChange>,
}

impl FavoriteSet {
    /// An empty set for `entity_type` (a collection name, e.g. `businesses`).
    pub fn new(session: &Session, entity_type: &str) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            user_id: session.user_id().to_string(),
            entity_type: entity_type.to_string(),
            ids: RwLock::new(BTreeSet::new()),
            changes,
        }
    }

    /// Replace the local set with the user's relations from the backend.
    pub async fn load(&self, gateway: &dyn DataGateway) -> AppResult<usize> {
        let query = Query::new()
            .eq("user_id", self.user_id.clone())
            .eq("entity_type", self.entity_type.clone());
        let rows = gateway
            .query(FavoriteRelation::COLLECTION, &query)
            .await
            .map_err(|e| e.into_fetch("Failed to load favorites"))?;

        let ids: BTreeSet<String> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<FavoriteRelation>(row) {
                Ok(relation) => Some(relation.entity_id),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable favorite");
                    None
                }
            })
            .collect();
        let count = ids.len();

        *self.ids.write().unwrap_or_else(|e| e.into_inner()) = ids;
        debug!(entity_type = %self.entity_type, count, "Favorites loaded");
        Ok(count)
    }

    /// The owning user.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The favorited collection.
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Whether `entity_id` is a favorite.
    pub fn is_favorite(&self, entity_id: &str) -> bool {
        self.ids
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(entity_id)
    }

    /// Set the local flag, returning its previous value.
    pub fn set_local(&self, entity_id: &str, favorite: bool) -> bool {
        let previous = {
            let mut ids = self.ids.write().unwrap_or_else(|e| e.into_inner());
            if favorite {
                !ids.insert(entity_id.to_string())
            } else {
                ids.remove(entity_id)
            }
        };
        if previous != favorite {
            let _ = self.changes.send(FavoriteChange {
                entity_id: entity_id.to_string(),
                favorite,
            });
        }
        previous
    }

    /// Favorited ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.ids
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Subscribe to local flag changes.
    pub fn subscribe(&self) -> broadcast::Receiver<FavoriteChange> {
        self.changes.subscribe()
    }

    /// The relation row for `entity_id`.
    pub fn relation(&self, entity_id: &str) -> FavoriteRelation {
        FavoriteRelation::new(&self.user_id, &self.entity_type, entity_id)
    }
}
