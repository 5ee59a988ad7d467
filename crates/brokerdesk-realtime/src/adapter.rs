//! Real-time delivery adapter.
//!
//! Keeps a collection store in step with the backend's push channel for
//! one signed-in user. The subscription runs on its own task and survives
//! connection loss by reconnecting with backoff; only shutdown or session
//! teardown stops it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use brokerdesk_core::config::RealtimeConfig;
use brokerdesk_core::traits::realtime::{RealtimeSource, Subscription};
use brokerdesk_core::types::filter::FilterField;
use brokerdesk_entity::record::Record;
use brokerdesk_view::session::Session;
use brokerdesk_view::store::{CollectionStore, Placement};

use crate::alert::Alert;
use crate::backoff::Backoff;
use crate::change::{Delivery, decode};

/// Buffer of the alert channel.
const ALERT_BUFFER: usize = 64;

/// Handle to a running delivery task.
#[derive(Debug)]
pub struct DeliveryAdapter {
    collection: &'static str,
    cancel: CancellationToken,
    alerts: broadcast::Sender<Alert>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Everything the delivery task owns.
struct DeliveryTask<T: Record> {
    source: Arc<dyn RealtimeSource>,
    store: Arc<CollectionStore<T>>,
    session: Session,
    filter: String,
    backoff: Backoff,
    alerts: broadcast::Sender<Alert>,
    cancel: CancellationToken,
}

impl DeliveryAdapter {
    /// Start delivering `T::COLLECTION` changes owned by the session user
    /// (matched on `user_id`) into `store`.
    pub fn spawn<T: Record>(
        source: Arc<dyn RealtimeSource>,
        session: &Session,
        store: Arc<CollectionStore<T>>,
        config: &RealtimeConfig,
    ) -> Self {
        Self::spawn_with_owner(source, session, store, config, "user_id")
    }

    /// Like [`spawn`](Self::spawn), matching ownership on `owner_field`.
    pub fn spawn_with_owner<T: Record>(
        source: Arc<dyn RealtimeSource>,
        session: &Session,
        store: Arc<CollectionStore<T>>,
        config: &RealtimeConfig,
        owner_field: &str,
    ) -> Self {
        let cancel = session.child_token();
        let (alerts, _) = broadcast::channel(ALERT_BUFFER);
        let filter = FilterField::eq(owner_field, session.user_id()).to_expression();

        let task = DeliveryTask {
            source,
            store,
            session: session.clone(),
            filter,
            backoff: Backoff::from_config(config),
            alerts: alerts.clone(),
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(task.run());

        Self {
            collection: T::COLLECTION,
            cancel,
            alerts,
            task: Mutex::new(Some(handle)),
        }
    }

    /// Subscribe to alerts for high-priority inserts.
    pub fn alerts(&self) -> broadcast::Receiver<Alert> {
        self.alerts.subscribe()
    }

    /// Whether the delivery task is still running.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Stop delivering and wait for the task to unsubscribe.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(collection = self.collection, error = %e, "Delivery task ended abnormally");
            }
        }
    }
}

impl Drop for DeliveryAdapter {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<T: Record> DeliveryTask<T> {
    async fn run(mut self) {
        info!(collection = T::COLLECTION, filter = %self.filter, "Realtime delivery started");

        while !self.cancel.is_cancelled() {
            let subscribed = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = self.source.subscribe(T::COLLECTION, &self.filter) => result,
            };

            match subscribed {
                Ok(subscription) => {
                    debug!(collection = T::COLLECTION, handle = %subscription.handle, "Subscribed");
                    if !self.pump(subscription).await {
                        break;
                    }
                    warn!(collection = T::COLLECTION, "Realtime connection lost, reconnecting");
                }
                Err(e) => {
                    warn!(collection = T::COLLECTION, error = %e, "Realtime subscribe failed");
                }
            }

            let delay = self.backoff.next_delay();
            debug!(
                collection = T::COLLECTION,
                attempt = self.backoff.attempt(),
                delay_ms = delay.as_millis() as u64,
                "Waiting before reconnect"
            );
            if !self.sleep(delay).await {
                break;
            }
        }

        if !self.session.is_active() {
            self.store.clear();
        }
        info!(collection = T::COLLECTION, "Realtime delivery stopped");
    }

    /// Forward events until the channel closes (`true`) or the adapter is
    /// cancelled (`false`).
    async fn pump(&mut self, mut subscription: Subscription) -> bool {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    self.source.unsubscribe(subscription.handle).await;
                    return false;
                }
                payload = subscription.events.recv() => match payload {
                    Some(payload) => {
                        self.backoff.reset();
                        self.deliver(&payload);
                    }
                    None => return true,
                },
            }
        }
    }

    fn deliver(&self, payload: &str) {
        match decode::<T>(payload) {
            Ok(Delivery::Upsert { record, inserted }) => {
                let alert = if inserted { Alert::for_record(&record) } else { None };
                let placement = if inserted { Placement::Head } else { Placement::Sorted };
                self.store.upsert_local_at(record, placement);
                if let Some(alert) = alert {
                    info!(collection = T::COLLECTION, id = %alert.id, priority = alert.priority.as_str(), "Raising alert");
                    let _ = self.alerts.send(alert);
                }
            }
            Ok(Delivery::Remove { id }) => {
                self.store.remove_local(&id);
            }
            Err(e) => {
                warn!(collection = T::COLLECTION, error = %e, "Dropping undecodable change");
            }
        }
    }

    /// Sleep unless cancelled first; returns `false` on cancellation.
    async fn sleep(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
