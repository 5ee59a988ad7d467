//! Selection and detail controller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::debug;

use brokerdesk_entity::record::Record;
use brokerdesk_entity::score::ScoreRecord;

use crate::scoring::ScoringStrategy;
use crate::store::{CollectionStore, StoreChange};

/// What the detail panel is showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SelectionState {
    /// Nothing selected.
    #[default]
    Unselected,
    /// An entity is selected.
    Selected(String),
}

/// Scores computed against one store revision.
#[derive(Debug, Default)]
struct ScoreCache {
    revision: u64,
    scores: HashMap<String, ScoreRecord>,
}

/// Tracks the selected entity of a store and derives its detail metrics.
///
/// A selection whose entity is removed from the store (deleted locally,
/// by a realtime event, or dropped by a reload or clear) becomes
/// [`SelectionState::Unselected`], even if the same id comes back later.
#[derive(Debug)]
pub struct SelectionController<T: Record> {
    store: Arc<CollectionStore<T>>,
    strategy: Arc<dyn ScoringStrategy<T>>,
    state: Mutex<Selection>,
    cache: Mutex<ScoreCache>,
}

/// Selection plus the store changes not yet applied to it.
#[derive(Debug)]
struct Selection {
    state: SelectionState,
    changes: Receiver<StoreChange>,
}

impl<T: Record> SelectionController<T> {
    /// Create a controller over `store`, scoring with `strategy`.
    pub fn new(store: Arc<CollectionStore<T>>, strategy: Arc<dyn ScoringStrategy<T>>) -> Self {
        let changes = store.subscribe();
        Self {
            store,
            strategy,
            state: Mutex::new(Selection {
                state: SelectionState::Unselected,
                changes,
            }),
            cache: Mutex::new(ScoreCache::default()),
        }
    }

    /// Select an entity by id, or clear the selection with `None`.
    ///
    /// Any id is accepted; an id missing from the store reads as no
    /// selection.
    pub fn select(&self, id: Option<&str>) {
        let next = match id {
            Some(id) => SelectionState::Selected(id.to_string()),
            None => SelectionState::Unselected,
        };
        debug!(collection = T::COLLECTION, selection = ?next, "Selection changed");
        let mut selection = self.lock_selection();
        // Changes made before this call belong to the previous selection.
        while !matches!(
            selection.changes.try_recv(),
            Err(TryRecvError::Empty | TryRecvError::Closed)
        ) {}
        selection.state = next;
    }

    /// The selected entity, if any and still present.
    pub fn current(&self) -> Option<T> {
        let mut selection = self.lock_selection();
        self.sync(&mut selection);
        let SelectionState::Selected(id) = &selection.state else {
            return None;
        };
        match self.store.get(id) {
            Some(entity) => Some(entity),
            None => {
                debug!(collection = T::COLLECTION, id = %id, "Selected entity vanished");
                selection.state = SelectionState::Unselected;
                None
            }
        }
    }

    /// Current selection state, after checking the entity still exists.
    pub fn state(&self) -> SelectionState {
        let _ = self.current();
        self.lock_selection().state.clone()
    }

    /// Apply pending store changes to the selection.
    fn sync(&self, selection: &mut Selection) {
        loop {
            let vanished = match selection.changes.try_recv() {
                Ok(StoreChange::Removed { id, .. }) => {
                    matches!(&selection.state, SelectionState::Selected(s) if *s == id)
                }
                Ok(StoreChange::Cleared { .. }) => true,
                Ok(StoreChange::Loaded { .. } | StoreChange::Upserted { .. }) => false,
                // Missed changes: presence is checked by the caller.
                Err(TryRecvError::Lagged(skipped)) => {
                    debug!(collection = T::COLLECTION, skipped, "Selection missed store changes");
                    false
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return,
            };
            if vanished && selection.state != SelectionState::Unselected {
                debug!(collection = T::COLLECTION, "Selected entity removed");
                selection.state = SelectionState::Unselected;
            }
        }
    }

    fn lock_selection(&self) -> std::sync::MutexGuard<'_, Selection> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Score of an entity in the store, cached until the store changes.
    pub fn score_for(&self, id: &str) -> Option<ScoreRecord> {
        let revision = self.store.revision();
        {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            if cache.revision != revision {
                cache.scores.clear();
                cache.revision = revision;
            }
            if let Some(score) = cache.scores.get(id) {
                return Some(score.clone());
            }
        }

        let entity = self.store.get(id)?;
        let score = self.strategy.compute(&entity);

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if cache.revision == revision {
            cache.scores.insert(id.to_string(), score.clone());
        }
        Some(score)
    }

    /// Score of the selected entity.
    pub fn current_score(&self) -> Option<ScoreRecord> {
        let entity = self.current()?;
        self.score_for(entity.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brokerdesk_entity::Lead;
    use brokerdesk_gateway::MemoryBackend;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingScoring {
        calls: AtomicUsize,
    }

    impl ScoringStrategy<Lead> for CountingScoring {
        fn compute(&self, lead: &Lead) -> ScoreRecord {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ScoreRecord::from_factors(lead.id.clone(), &[("value", 1.0, lead.estimated_value)])
        }
    }

    fn lead(id: &str, value: f64) -> Lead {
        serde_json::from_value(json!({
            "id": id,
            "user_id": "u1",
            "name": "Lead",
            "status": "new",
            "estimated_value": value,
            "created_at": "2026-01-01T00:00:00Z",
        }))
        .unwrap()
    }

    fn controller() -> (Arc<CollectionStore<Lead>>, Arc<CountingScoring>, SelectionController<Lead>) {
        let store = Arc::new(CollectionStore::<Lead>::new(Arc::new(MemoryBackend::default())));
        store.upsert_local(lead("1", 40.0));
        store.upsert_local(lead("2", 70.0));
        let scoring = Arc::new(CountingScoring::default());
        let controller = SelectionController::new(store.clone(), scoring.clone());
        (store, scoring, controller)
    }

    #[test]
    fn test_select_and_current() {
        let (_, _, controller) = controller();
        assert!(controller.current().is_none());
        controller.select(Some("2"));
        assert_eq!(controller.current().unwrap().id, "2");
        assert_eq!(controller.state(), SelectionState::Selected("2".into()));
        controller.select(None);
        assert_eq!(controller.state(), SelectionState::Unselected);
    }

    #[test]
    fn test_removed_selection_becomes_unselected() {
        let (store, _, controller) = controller();
        controller.select(Some("1"));
        store.remove_local("1");
        assert!(controller.current().is_none());
        assert_eq!(controller.state(), SelectionState::Unselected);

        store.upsert_local(lead("1", 40.0));
        assert!(controller.current().is_none());
    }

    #[test]
    fn test_removal_is_not_undone_by_reinsert() {
        let (store, _, controller) = controller();
        controller.select(Some("1"));
        store.remove_local("1");
        store.upsert_local(lead("1", 40.0));

        assert!(controller.current().is_none());
        assert_eq!(controller.state(), SelectionState::Unselected);
    }

    #[test]
    fn test_restore_after_failed_delete_keeps_selection_cleared() {
        let (store, _, controller) = controller();
        controller.select(Some("2"));
        let (index, removed) = store.remove_local("2").unwrap();
        store.restore_at(index, removed);

        assert!(store.contains("2"));
        assert!(controller.current().is_none());
    }

    #[test]
    fn test_changes_before_select_do_not_clear_it() {
        let (store, _, controller) = controller();
        store.remove_local("1");
        store.upsert_local(lead("1", 40.0));
        controller.select(Some("1"));

        assert_eq!(controller.current().unwrap().id, "1");
        store.remove_local("2");
        assert_eq!(controller.state(), SelectionState::Selected("1".into()));
        store.clear();
        assert_eq!(controller.state(), SelectionState::Unselected);
    }

    #[test]
    fn test_scores_are_cached_per_revision() {
        let (store, scoring, controller) = controller();
        assert_eq!(controller.score_for("2").unwrap().score, 70);
        controller.score_for("2");
        assert_eq!(scoring.calls.load(Ordering::SeqCst), 1);

        store.update_local("2", |l| l.estimated_value = 90.0);
        assert_eq!(controller.score_for("2").unwrap().score, 90);
        assert_eq!(scoring.calls.load(Ordering::SeqCst), 2);

        assert!(controller.score_for("missing").is_none());
    }
}
