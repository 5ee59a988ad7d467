//! Entity collection store.
//!
//! Holds the ordered, in-memory list behind one page view. The backend is
//! the source of truth; the store is a read-through cache that every other
//! component (filter, selection, dispatcher, realtime adapter) reads and
//! writes through its methods. Items are kept newest first unless a caller
//! asks for a specific placement.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use brokerdesk_core::error::AppError;
use brokerdesk_core::result::AppResult;
use brokerdesk_core::traits::gateway::{DataGateway, Row};
use brokerdesk_core::types::query::Query;
use brokerdesk_core::types::sorting::SortField;
use brokerdesk_entity::record::Record;

use crate::notice::NoticeBoard;
use crate::session::Session;

/// Buffer of the change channel.
const CHANGE_BUFFER: usize = 256;

/// Where a new entity goes when it is not already present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Placement {
    /// By `created_at`, newest first.
    #[default]
    Sorted,
    /// At the front of the list.
    Head,
    /// At the end of the list.
    Tail,
}

/// A mutation of the store, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// The list was replaced by a load.
    Loaded { revision: u64, count: usize },
    /// An entity was inserted or replaced.
    Upserted { revision: u64, id: String },
    /// An entity was removed.
    Removed { revision: u64, id: String },
    /// The list was emptied.
    Cleared { revision: u64 },
}

impl StoreChange {
    /// Store revision after the change.
    pub fn revision(&self) -> u64 {
        match self {
            Self::Loaded { revision, .. }
            | Self::Upserted { revision, .. }
            | Self::Removed { revision, .. }
            | Self::Cleared { revision } => *revision,
        }
    }
}

/// Loading status, for rendering spinners and error banners.
#[derive(Debug, Clone, Default)]
pub struct LoadStatus {
    /// A load is in flight.
    pub loading: bool,
    /// The error of the most recent failed load, cleared by a success.
    pub last_error: Option<AppError>,
    /// When the list was last loaded successfully.
    pub loaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct StoreState<T> {
    items: Vec<T>,
    revision: u64,
    status: LoadStatus,
    /// Loads waiting on the backend.
    loads_in_flight: usize,
    /// Local changes made while a load was in flight, by id.
    touched: HashMap<String, LocalChange>,
    /// Revision of a clear made while a load was in flight.
    cleared_at: Option<u64>,
}

/// Last local change to one id.
#[derive(Debug, Clone, Copy)]
struct LocalChange {
    revision: u64,
    removed: bool,
}

impl<T: Record> StoreState<T> {
    /// Bump the revision, remembering the change for in-flight loads.
    fn bump(&mut self, id: &str, removed: bool) -> u64 {
        self.revision += 1;
        if self.loads_in_flight > 0 {
            let change = LocalChange {
                revision: self.revision,
                removed,
            };
            self.touched.insert(id.to_string(), change);
        }
        self.revision
    }

    /// Mark a load as finished, forgetting changes once none is pending.
    fn finish_load(&mut self) {
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        if self.loads_in_flight == 0 {
            self.touched.clear();
            self.cleared_at = None;
        }
    }

    /// Merge a load that started at revision `started` with local changes
    /// made since. Rows changed locally keep their local version; rows
    /// added locally and missing from the result stay at the head.
    fn merge_loaded(&self, loaded: Vec<T>, started: u64) -> Vec<T> {
        if self.cleared_at.is_some_and(|r| r > started) {
            return self.items.clone();
        }
        let since: HashMap<&str, LocalChange> = self
            .touched
            .iter()
            .filter(|(_, change)| change.revision > started)
            .map(|(id, change)| (id.as_str(), *change))
            .collect();
        if since.is_empty() {
            return loaded;
        }

        let mut merged: Vec<T> = loaded
            .into_iter()
            .filter(|e| !since.get(e.id()).is_some_and(|c| c.removed))
            .collect();
        let mut fresh = Vec::new();
        for local in self.items.iter().filter(|e| since.contains_key(e.id())) {
            match merged.iter().position(|e| e.id() == local.id()) {
                Some(index) => merged[index] = local.clone(),
                None => fresh.push(local.clone()),
            }
        }
        fresh.append(&mut merged);
        fresh
    }
}

/// Restricts loads to rows owned by the session user.
#[derive(Debug, Clone)]
struct OwnerScope {
    field: String,
    user_id: String,
}

/// In-memory ordered collection of one entity kind.
#[derive(Debug)]
pub struct CollectionStore<T: Record> {
    gateway: Arc<dyn DataGateway>,
    scope: Option<OwnerScope>,
    notices: Option<Arc<NoticeBoard>>,
    state: RwLock<StoreState<T>>,
    changes: broadcast::Sender<StoreChange>,
}

impl<T: Record> CollectionStore<T> {
    /// Create an unscoped store (e.g. public listings, the agent directory).
    pub fn new(gateway: Arc<dyn DataGateway>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            gateway,
            scope: None,
            notices: None,
            state: RwLock::new(StoreState {
                items: Vec::new(),
                revision: 0,
                status: LoadStatus::default(),
                loads_in_flight: 0,
                touched: HashMap::new(),
                cleared_at: None,
            }),
            changes,
        }
    }

    /// Create a store whose loads only return rows where `owner_field`
    /// equals the session user.
    pub fn scoped(gateway: Arc<dyn DataGateway>, session: &Session, owner_field: &str) -> Self {
        let mut store = Self::new(gateway);
        store.scope = Some(OwnerScope {
            field: owner_field.to_string(),
            user_id: session.user_id().to_string(),
        });
        store
    }

    /// Post load failures to `notices`.
    pub fn with_notices(mut self, notices: Arc<NoticeBoard>) -> Self {
        self.notices = Some(notices);
        self
    }

    /// Backend collection name.
    pub fn collection(&self) -> &'static str {
        T::COLLECTION
    }

    /// Fetch the collection from the backend and replace the local list.
    ///
    /// Rows that do not decode into `T` (or fail its invariants) are
    /// skipped. Local upserts and removals made while the query was in
    /// flight (realtime deliveries, optimistic actions) win over the
    /// fetched rows. On failure the previous list is kept, the error is
    /// recorded in [`status`](Self::status), and a notice is posted.
    pub async fn load(&self, query: Option<&Query>) -> AppResult<Vec<T>> {
        let mut query = query.cloned().unwrap_or_default();
        if let Some(scope) = &self.scope {
            query = query.eq(scope.field.clone(), scope.user_id.clone());
        }
        if !query.is_ordered() {
            query = query.order_by(SortField::newest_first());
        }

        let started = {
            let mut state = self.write_state();
            state.status.loading = true;
            state.loads_in_flight += 1;
            state.revision
        };

        let rows = match self.gateway.query(T::COLLECTION, &query).await {
            Ok(rows) => rows,
            Err(e) => {
                let err = e.into_fetch(format!("Failed to load {}", T::COLLECTION));
                warn!(collection = T::COLLECTION, error = %err, "Load failed, keeping previous items");
                {
                    let mut state = self.write_state();
                    state.finish_load();
                    let loading = state.loads_in_flight > 0;
                    state.status.loading = loading;
                    state.status.last_error = Some(err.clone());
                }
                if let Some(notices) = &self.notices {
                    notices.post_error(&err);
                }
                return Err(err);
            }
        };

        let fetched = rows.len();
        let loaded: Vec<T> = rows.into_iter().filter_map(decode_row::<T>).collect();
        let decoded = loaded.len();

        let (items, revision) = {
            let mut state = self.write_state();
            let items = state.merge_loaded(loaded, started);
            state.items = items.clone();
            state.revision += 1;
            state.finish_load();
            let loading = state.loads_in_flight > 0;
            state.status = LoadStatus {
                loading,
                last_error: None,
                loaded_at: Some(Utc::now()),
            };
            (items, state.revision)
        };
        let count = items.len();

        info!(
            collection = T::COLLECTION,
            fetched,
            decoded,
            kept = count,
            revision,
            "Collection loaded"
        );
        self.notify(StoreChange::Loaded { revision, count });
        Ok(items)
    }

    /// Insert or replace by id, keeping newest-first order.
    pub fn upsert_local(&self, entity: T) -> Option<T> {
        self.upsert_local_at(entity, Placement::Sorted)
    }

    /// Insert or replace by id.
    ///
    /// An entity already present is replaced where it stands; `placement`
    /// only decides where a new entity goes. Returns the replaced entity.
    pub fn upsert_local_at(&self, entity: T, placement: Placement) -> Option<T> {
        let id = entity.id().to_string();
        let (previous, revision) = {
            let mut state = self.write_state();
            let previous = match state.items.iter().position(|e| e.id() == id) {
                Some(index) => Some(std::mem::replace(&mut state.items[index], entity)),
                None => {
                    let index = match placement {
                        Placement::Head => 0,
                        Placement::Tail => state.items.len(),
                        Placement::Sorted => {
                            let created = entity.created_at();
                            state.items.partition_point(|e| e.created_at() >= created)
                        }
                    };
                    state.items.insert(index, entity);
                    None
                }
            };
            (previous, state.bump(&id, false))
        };

        debug!(collection = T::COLLECTION, id = %id, replaced = previous.is_some(), "Upserted locally");
        self.notify(StoreChange::Upserted { revision, id });
        previous
    }

    /// Remove by id, returning the former position and entity.
    ///
    /// Removing an absent id is a no-op.
    pub fn remove_local(&self, id: &str) -> Option<(usize, T)> {
        let (removed, revision) = {
            let mut state = self.write_state();
            let index = state.items.iter().position(|e| e.id() == id)?;
            let removed = state.items.remove(index);
            ((index, removed), state.bump(id, true))
        };

        debug!(collection = T::COLLECTION, id, "Removed locally");
        self.notify(StoreChange::Removed {
            revision,
            id: id.to_string(),
        });
        Some(removed)
    }

    /// Mutate an entity in place, returning its value before the change.
    pub fn update_local<F>(&self, id: &str, mutate: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        let (previous, revision) = {
            let mut state = self.write_state();
            let entity = state.items.iter_mut().find(|e| e.id() == id)?;
            let previous = entity.clone();
            mutate(entity);
            (previous, state.bump(id, false))
        };

        self.notify(StoreChange::Upserted {
            revision,
            id: id.to_string(),
        });
        Some(previous)
    }

    /// Put an entity back at `index` (clamped), as a rollback of
    /// [`remove_local`](Self::remove_local). Replaces it if it reappeared.
    pub fn restore_at(&self, index: usize, entity: T) {
        let id = entity.id().to_string();
        let revision = {
            let mut state = self.write_state();
            match state.items.iter().position(|e| e.id() == id) {
                Some(existing) => state.items[existing] = entity,
                None => {
                    let index = index.min(state.items.len());
                    state.items.insert(index, entity);
                }
            }
            state.bump(&id, false)
        };

        self.notify(StoreChange::Upserted { revision, id });
    }

    /// Drop every item.
    pub fn clear(&self) {
        let revision = {
            let mut state = self.write_state();
            state.items.clear();
            state.revision += 1;
            if state.loads_in_flight > 0 {
                state.cleared_at = Some(state.revision);
                state.touched.clear();
            }
            state.revision
        };
        self.notify(StoreChange::Cleared { revision });
    }

    /// Snapshot of the list.
    pub fn items(&self) -> Vec<T> {
        self.read_state().items.clone()
    }

    /// Look up an entity by id.
    pub fn get(&self, id: &str) -> Option<T> {
        self.read_state().items.iter().find(|e| e.id() == id).cloned()
    }

    /// Whether an entity with this id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.read_state().items.iter().any(|e| e.id() == id)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.read_state().items.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.read_state().revision
    }

    /// Current loading status.
    pub fn status(&self) -> LoadStatus {
        self.read_state().status.clone()
    }

    /// Subscribe to mutations.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    fn notify(&self, change: StoreChange) {
        let _ = self.changes.send(change);
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, StoreState<T>> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, StoreState<T>> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Decode a backend row, logging and skipping rows that do not fit.
fn decode_row<T: Record>(row: Row) -> Option<T> {
    let id = row.get("id").and_then(|v| v.as_str()).map(str::to_string);
    let entity: T = match serde_json::from_value(row) {
        Ok(entity) => entity,
        Err(e) => {
            warn!(collection = T::COLLECTION, id = ?id, error = %e, "Skipping undecodable row");
            return None;
        }
    };
    if let Err(e) = entity.check() {
        warn!(collection = T::COLLECTION, id = ?id, error = %e, "Skipping invalid row");
        return None;
    }
    Some(entity)
}
