//! Optimistic mutation dispatcher.
//!
//! Every action follows the same path: take the entity's lock, apply the
//! change locally (renderers see it at once), issue the remote write, and
//! either mark the mutation committed or undo the local change and post a
//! notice. Each entity key moves through
//! `Idle → Pending → Committed | RolledBack`.
//!
//! Remote writes run on their own task. [`ActionDispatcher::abandon`]
//! stops waiting for them; a write already issued still reaches the
//! backend and is not rolled back.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use brokerdesk_core::error::AppError;
use brokerdesk_core::result::AppResult;
use brokerdesk_core::traits::gateway::DataGateway;
use brokerdesk_entity::favorite::FavoriteRelation;
use brokerdesk_entity::notification::Notification;
use brokerdesk_entity::record::Record;

use crate::favorites::FavoriteSet;
use crate::notice::NoticeBoard;
use crate::store::CollectionStore;

/// Lifecycle of the latest mutation on one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MutationState {
    /// No mutation recorded.
    #[default]
    Idle,
    /// Applied locally, remote write in flight.
    Pending,
    /// Remote write confirmed.
    Committed,
    /// Remote write failed and the local change was undone.
    RolledBack,
}

/// Dispatches optimistic actions for one view.
#[derive(Debug)]
pub struct ActionDispatcher {
    gateway: Arc<dyn DataGateway>,
    notices: Arc<NoticeBoard>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    states: DashMap<String, MutationState>,
    cancel: CancellationToken,
}

impl ActionDispatcher {
    /// Create a dispatcher; `cancel` is usually a session child token.
    pub fn new(
        gateway: Arc<dyn DataGateway>,
        notices: Arc<NoticeBoard>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            notices,
            locks: DashMap::new(),
            states: DashMap::new(),
            cancel,
        }
    }

    /// Key of an entity in the lock and state tables.
    pub fn key(collection: &str, id: &str) -> String {
        format!("{collection}/{id}")
    }

    /// Key of a favorite flag.
    pub fn favorite_key(entity_type: &str, entity_id: &str) -> String {
        Self::key(FavoriteRelation::COLLECTION, &format!("{entity_type}/{entity_id}"))
    }

    /// State of the latest mutation on `key`.
    pub fn state_of(&self, key: &str) -> MutationState {
        self.states.get(key).map(|s| *s).unwrap_or_default()
    }

    /// Stop waiting for in-flight writes (the view is going away).
    pub fn abandon(&self) {
        info!("Abandoning in-flight actions");
        self.cancel.cancel();
    }

    /// Whether [`abandon`](Self::abandon) was called.
    pub fn is_abandoned(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Flip the favorite flag of `entity_id`, returning the new value.
    pub async fn toggle_favorite(&self, favorites: &FavoriteSet, entity_id: &str) -> AppResult<bool> {
        let key = Self::favorite_key(favorites.entity_type(), entity_id);
        let guard = self.acquire(&key).await?;

        let was_favorite = favorites.is_favorite(entity_id);
        let now_favorite = !was_favorite;
        favorites.set_local(entity_id, now_favorite);

        let gateway = self.gateway.clone();
        let relation = favorites.relation(entity_id);
        let write = async move {
            if now_favorite {
                let row = serde_json::to_value(&relation)?;
                gateway
                    .upsert(FavoriteRelation::COLLECTION, row, "id")
                    .await
                    .map(|_| ())
            } else {
                gateway.delete(FavoriteRelation::COLLECTION, &relation.id).await
            }
        };

        let result = self
            .commit(&key, "Failed to update favorite", write, || {
                favorites.set_local(entity_id, was_favorite);
            })
            .await;
        self.release(&key, guard);
        result.map(|_| now_favorite)
    }

    /// Mark a notification read. Already-read notifications are left alone.
    pub async fn mark_read(&self, store: &CollectionStore<Notification>, id: &str) -> AppResult<()> {
        let key = Self::key(Notification::COLLECTION, id);
        let guard = self.acquire(&key).await?;

        let previous = match store.update_local(id, |n| n.is_read = true) {
            Some(previous) => previous,
            None => {
                self.release(&key, guard);
                return Err(AppError::not_found(format!("Notification '{id}' not found")));
            }
        };
        if previous.is_read {
            self.release(&key, guard);
            return Ok(());
        }

        let gateway = self.gateway.clone();
        let row_id = id.to_string();
        let write = async move {
            gateway
                .update(
                    Notification::COLLECTION,
                    &row_id,
                    serde_json::json!({ "is_read": true }),
                )
                .await
                .map(|_| ())
        };

        let result = self
            .commit(&key, "Failed to mark notification read", write, || {
                store.update_local(id, |n| n.is_read = previous.is_read);
            })
            .await;
        self.release(&key, guard);
        result
    }

    /// Mark every unread notification read, returning how many changed.
    ///
    /// Each notification is its own mutation: failures roll back only
    /// their own flag. The first failure is returned after all finish.
    pub async fn mark_all_read(&self, store: &CollectionStore<Notification>) -> AppResult<usize> {
        let unread: Vec<String> = store
            .items()
            .into_iter()
            .filter(Notification::is_unread)
            .map(|n| n.id)
            .collect();

        let results = join_all(unread.iter().map(|id| self.mark_read(store, id))).await;

        let mut marked = 0;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(()) => marked += 1,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(marked),
        }
    }

    /// Delete an entity, restoring it at its old position on failure.
    pub async fn delete<T: Record>(&self, store: &CollectionStore<T>, id: &str) -> AppResult<()> {
        let key = Self::key(T::COLLECTION, id);
        let guard = self.acquire(&key).await?;

        let Some((index, removed)) = store.remove_local(id) else {
            self.release(&key, guard);
            return Err(AppError::not_found(format!(
                "{} '{id}' not found",
                T::COLLECTION
            )));
        };

        let gateway = self.gateway.clone();
        let row_id = id.to_string();
        let write = async move { gateway.delete(T::COLLECTION, &row_id).await };

        let result = self
            .commit(&key, &format!("Failed to delete from {}", T::COLLECTION), write, || {
                store.restore_at(index, removed);
            })
            .await;
        self.release(&key, guard);
        result
    }

    /// Wait for the entity's lock, unless the view is abandoned first.
    async fn acquire(&self, key: &str) -> AppResult<OwnedMutexGuard<()>> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AppError::cancelled("View was closed")),
            guard = lock.lock_owned() => Ok(guard),
        }
    }

    /// Drop the guard and forget the lock if nobody else is waiting.
    fn release(&self, key: &str, guard: OwnedMutexGuard<()>) {
        drop(guard);
        self.locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Run the remote write and settle the mutation.
    async fn commit<W, R>(&self, key: &str, context: &str, write: W, revert: R) -> AppResult<()>
    where
        W: Future<Output = AppResult<()>> + Send + 'static,
        R: FnOnce(),
    {
        self.states.insert(key.to_string(), MutationState::Pending);
        let task = tokio::spawn(write);

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(key, "Abandoned wait for remote write");
                self.states.insert(key.to_string(), MutationState::Idle);
                return Err(AppError::cancelled("View was closed"));
            }
            joined = task => match joined {
                Ok(result) => result,
                Err(e) => Err(AppError::internal(format!("Remote write task failed: {e}"))),
            },
        };

        match outcome {
            Ok(()) => {
                self.states.insert(key.to_string(), MutationState::Committed);
                debug!(key, "Mutation committed");
                Ok(())
            }
            Err(e) => {
                revert();
                self.states.insert(key.to_string(), MutationState::RolledBack);
                let err = e.into_write(context);
                warn!(key, error = %err, "Mutation rolled back");
                self.notices.post_error(&err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use brokerdesk_core::error::ErrorKind;
    use brokerdesk_core::traits::auth::UserIdentity;
    use brokerdesk_entity::Lead;
    use brokerdesk_gateway::MemoryBackend;
    use serde_json::json;

    use crate::session::Session;

    fn session() -> Session {
        Session::for_user(UserIdentity {
            id: "u1".into(),
            email: None,
        })
    }

    fn setup() -> (Arc<MemoryBackend>, Arc<NoticeBoard>, ActionDispatcher) {
        let backend = Arc::new(MemoryBackend::default());
        let notices = Arc::new(NoticeBoard::default());
        let dispatcher =
            ActionDispatcher::new(backend.clone(), notices.clone(), CancellationToken::new());
        (backend, notices, dispatcher)
    }

    fn notification_store(backend: &Arc<MemoryBackend>) -> CollectionStore<Notification> {
        let store = CollectionStore::<Notification>::new(backend.clone());
        for (id, read) in [("n1", false), ("n2", false), ("n3", true)] {
            let row = json!({
                "id": id,
                "user_id": "u1",
                "title": format!("Notice {id}"),
                "is_read": read,
                "created_at": "2026-01-01T00:00:00Z",
            });
            backend.seed(Notification::COLLECTION, [row.clone()]);
            store.upsert_local(serde_json::from_value(row).unwrap());
        }
        store
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_original() {
        let (backend, _, dispatcher) = setup();
        let favorites = FavoriteSet::new(&session(), "businesses");

        assert!(dispatcher.toggle_favorite(&favorites, "b1").await.unwrap());
        assert_eq!(backend.rows(FavoriteRelation::COLLECTION).len(), 1);
        assert!(!dispatcher.toggle_favorite(&favorites, "b1").await.unwrap());
        assert!(!favorites.is_favorite("b1"));
        assert!(backend.rows(FavoriteRelation::COLLECTION).is_empty());
        assert_eq!(
            dispatcher.state_of(&ActionDispatcher::favorite_key("businesses", "b1")),
            MutationState::Committed
        );
    }

    #[tokio::test]
    async fn test_failed_toggle_rolls_back_and_posts_notice() {
        let (backend, notices, dispatcher) = setup();
        backend.set_fail_writes(true);
        let favorites = FavoriteSet::new(&session(), "businesses");

        let err = dispatcher.toggle_favorite(&favorites, "2").await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Write);
        assert!(!favorites.is_favorite("2"));
        assert_eq!(notices.active().len(), 1);
        assert_eq!(
            dispatcher.state_of(&ActionDispatcher::favorite_key("businesses", "2")),
            MutationState::RolledBack
        );
    }

    #[tokio::test]
    async fn test_same_entity_toggles_serialize() {
        let (backend, _, dispatcher) = setup();
        backend.set_write_latency(Duration::from_millis(20));
        let favorites = FavoriteSet::new(&session(), "businesses");

        let (first, second) = tokio::join!(
            dispatcher.toggle_favorite(&favorites, "b1"),
            dispatcher.toggle_favorite(&favorites, "b1"),
        );

        assert!(first.unwrap());
        assert!(!second.unwrap());
        assert!(!favorites.is_favorite("b1"));
        assert!(backend.rows(FavoriteRelation::COLLECTION).is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_keeps_item_in_list() {
        let (backend, _, dispatcher) = setup();
        let store = notification_store(&backend);

        dispatcher.mark_read(&store, "n1").await.unwrap();

        assert!(store.get("n1").unwrap().is_read);
        assert_eq!(store.len(), 3);
        let stored = backend.rows(Notification::COLLECTION);
        assert!(stored.iter().any(|r| r["id"] == "n1" && r["is_read"] == true));
    }

    #[tokio::test]
    async fn test_mark_read_rolls_back() {
        let (backend, _, dispatcher) = setup();
        let store = notification_store(&backend);
        backend.set_fail_writes(true);

        assert!(dispatcher.mark_read(&store, "n1").await.is_err());
        assert!(!store.get("n1").unwrap().is_read);
        assert_eq!(
            dispatcher.mark_read(&store, "missing").await.unwrap_err().kind,
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_mark_all_read() {
        let (backend, _, dispatcher) = setup();
        let store = notification_store(&backend);
        assert_eq!(dispatcher.mark_all_read(&store).await.unwrap(), 2);
        assert!(store.items().iter().all(|n| n.is_read));
    }

    #[tokio::test]
    async fn test_failed_delete_restores_position() {
        let (backend, notices, dispatcher) = setup();
        let store = CollectionStore::<Lead>::new(backend.clone());
        for (id, ts) in [
            ("a", "2026-01-03T00:00:00Z"),
            ("b", "2026-01-02T00:00:00Z"),
            ("c", "2026-01-01T00:00:00Z"),
        ] {
            store.upsert_local(
                serde_json::from_value(json!({
                    "id": id, "user_id": "u1", "name": id, "status": "new", "created_at": ts,
                }))
                .unwrap(),
            );
        }
        backend.set_fail_writes(true);

        assert!(dispatcher.delete(&store, "b").await.is_err());
        let ids: Vec<String> = store.items().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(notices.active().len(), 1);

        backend.set_fail_writes(false);
        dispatcher.delete(&store, "b").await.unwrap();
        assert!(!store.contains("b"));
    }

    #[tokio::test]
    async fn test_abandon_keeps_issued_write() {
        let (backend, _, dispatcher) = setup();
        backend.set_write_latency(Duration::from_millis(50));
        let favorites = FavoriteSet::new(&session(), "businesses");

        let toggle = dispatcher.toggle_favorite(&favorites, "b1");
        let abandon = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            dispatcher.abandon();
        };
        let (result, _) = tokio::join!(toggle, abandon);

        assert_eq!(result.unwrap_err().kind, ErrorKind::Cancelled);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(backend.rows(FavoriteRelation::COLLECTION).len(), 1);
        assert!(dispatcher.toggle_favorite(&favorites, "b1").await.is_err());
    }
}
