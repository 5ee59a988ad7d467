//! In-memory backend for single-process runs and tests.
//!
//! Implements the row store, realtime fan-out, callable functions, and auth
//! context in one struct so that writes made through the gateway are pushed
//! to realtime subscribers, the way the hosted backend behaves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use brokerdesk_core::error::AppError;
use brokerdesk_core::result::AppResult;
use brokerdesk_core::traits::auth::{AuthProvider, UserIdentity};
use brokerdesk_core::traits::gateway::{DataGateway, Row};
use brokerdesk_core::traits::realtime::{
    ChangeEvent, ChangeKind, RealtimeSource, Subscription, SubscriptionHandle,
};
use brokerdesk_core::types::filter::FilterField;
use brokerdesk_core::types::query::Query;

use crate::row::{expect_object, merge_patch, row_id, sort_rows};

/// Handler for a callable function.
pub type FunctionHandler = Arc<dyn Fn(Row) -> AppResult<Row> + Send + Sync>;

/// Default buffer for subscription channels.
const DEFAULT_BUFFER: usize = 256;

/// A realtime subscriber.
#[derive(Debug)]
struct Subscriber {
    collection: String,
    filter: Option<FilterField>,
    tx: mpsc::Sender<String>,
}

impl Subscriber {
    fn wants(&self, collection: &str, row: Option<&Row>) -> bool {
        if self.collection != collection {
            return false;
        }
        match (&self.filter, row) {
            (None, _) => true,
            (Some(filter), Some(row)) => filter.matches_row(row),
            (Some(_), None) => false,
        }
    }
}

/// Fault injection switches.
#[derive(Debug, Default)]
struct Faults {
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_subscribe: AtomicBool,
    read_latency_ms: AtomicU64,
    write_latency_ms: AtomicU64,
}

/// In-process backend implementing [`DataGateway`], [`RealtimeSource`],
/// and [`AuthProvider`].
pub struct MemoryBackend {
    /// Collection name → rows in insertion order.
    tables: RwLock<HashMap<String, Vec<Row>>>,
    /// Open subscriptions.
    subscribers: DashMap<u64, Subscriber>,
    /// Next subscription handle.
    next_handle: AtomicU64,
    /// Registered callable functions.
    functions: DashMap<String, FunctionHandler>,
    /// Log of function invocations.
    invocations: Mutex<Vec<(String, Row)>>,
    /// Signed-in user.
    current_user: RwLock<Option<UserIdentity>>,
    /// Fault injection.
    faults: Faults,
    /// Subscription channel buffer size.
    buffer_size: usize,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("subscribers", &self.subscribers.len())
            .field("functions", &self.functions.len())
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            subscribers: DashMap::new(),
            next_handle: AtomicU64::new(1),
            functions: DashMap::new(),
            invocations: Mutex::new(Vec::new()),
            current_user: RwLock::new(None),
            faults: Faults::default(),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Sign a user in.
    pub fn sign_in(&self, user_id: &str) {
        let mut user = self.current_user.write().unwrap_or_else(|e| e.into_inner());
        *user = Some(UserIdentity {
            id: user_id.to_string(),
            email: None,
        });
    }

    /// Load rows without emitting change events.
    pub fn seed(&self, collection: &str, rows: impl IntoIterator<Item = Row>) {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables
            .entry(collection.to_string())
            .or_default()
            .extend(rows);
    }

    /// Snapshot of a collection.
    pub fn rows(&self, collection: &str) -> Vec<Row> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables.get(collection).cloned().unwrap_or_default()
    }

    /// Register a callable function.
    pub fn register_function<F>(&self, name: &str, handler: F)
    where
        F: Fn(Row) -> AppResult<Row> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Arc::new(handler));
    }

    /// Function invocations received so far.
    pub fn invocations(&self) -> Vec<(String, Row)> {
        self.invocations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Make every query fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.faults.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write (insert, update, delete, upsert) fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.faults.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make new subscriptions fail.
    pub fn set_fail_subscribe(&self, fail: bool) {
        self.faults.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// Delay every query result by `latency`. Rows are read before the
    /// delay, so writes made meanwhile are missing from the result.
    pub fn set_read_latency(&self, latency: Duration) {
        self.faults
            .read_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Delay every write by `latency`.
    pub fn set_write_latency(&self, latency: Duration) {
        self.faults
            .write_latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Drop every open subscription, as if the connection was lost.
    pub fn disconnect_all(&self) {
        let count = self.subscribers.len();
        self.subscribers.clear();
        debug!(count, "Dropped all realtime subscriptions");
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Push a raw frame to every subscriber of a collection.
    pub fn push_raw(&self, collection: &str, payload: &str) {
        for entry in self.subscribers.iter() {
            if entry.value().collection == collection {
                let _ = entry.value().tx.try_send(payload.to_string());
            }
        }
    }

    fn publish(&self, collection: &str, event: ChangeEvent) {
        let routed = match event.event_type {
            ChangeKind::Delete => event.old_row.as_ref(),
            _ => event.new_row.as_ref(),
        };
        let payload = event.to_payload();
        let mut closed = Vec::new();

        for entry in self.subscribers.iter() {
            if !entry.value().wants(collection, routed) {
                continue;
            }
            match entry.value().tx.try_send(payload.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(handle = entry.key(), collection, "Subscriber buffer full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        for handle in closed {
            self.subscribers.remove(&handle);
        }
    }

    async fn before_write(&self) -> AppResult<()> {
        let latency = self.faults.write_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.faults.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::service_unavailable("Memory backend rejected the write"));
        }
        Ok(())
    }
}

#[async_trait]
impl DataGateway for MemoryBackend {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn query(&self, collection: &str, query: &Query) -> AppResult<Vec<Row>> {
        if self.faults.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::service_unavailable("Memory backend rejected the query"));
        }

        let mut rows: Vec<Row> = {
            let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
            tables
                .get(collection)
                .map(|rows| {
                    rows.iter()
                        .filter(|row| query.filters.iter().all(|f| f.matches_row(row)))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };

        if let Some(order) = &query.order {
            sort_rows(&mut rows, order);
        }

        if let Some(page) = &query.page {
            rows = rows
                .into_iter()
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .collect();
        }

        let latency = self.faults.read_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        Ok(rows)
    }

    async fn insert(&self, collection: &str, mut row: Row) -> AppResult<Row> {
        self.before_write().await?;
        expect_object(&row)?;

        if row_id(&row).is_none() {
            row["id"] = Row::String(Uuid::new_v4().to_string());
        }

        {
            let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
            let rows = tables.entry(collection.to_string()).or_default();
            if rows.iter().any(|r| row_id(r) == row_id(&row)) {
                return Err(AppError::conflict(format!(
                    "Row '{}' already exists in '{collection}'",
                    row_id(&row).unwrap_or_default()
                )));
            }
            rows.push(row.clone());
        }

        self.publish(
            collection,
            ChangeEvent::new(ChangeKind::Insert, Some(row.clone()), None),
        );
        Ok(row)
    }

    async fn update(&self, collection: &str, id: &str, patch: Row) -> AppResult<Row> {
        self.before_write().await?;

        let (old, new) = {
            let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
            let row = tables
                .get_mut(collection)
                .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
                .ok_or_else(|| AppError::not_found(format!("No row '{id}' in '{collection}'")))?;
            let old = row.clone();
            merge_patch(row, &patch)?;
            (old, row.clone())
        };

        self.publish(
            collection,
            ChangeEvent::new(ChangeKind::Update, Some(new.clone()), Some(old)),
        );
        Ok(new)
    }

    async fn delete(&self, collection: &str, id: &str) -> AppResult<()> {
        self.before_write().await?;

        let removed = {
            let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
            tables.get_mut(collection).and_then(|rows| {
                rows.iter()
                    .position(|r| row_id(r) == Some(id))
                    .map(|index| rows.remove(index))
            })
        };

        if let Some(old) = removed {
            self.publish(collection, ChangeEvent::new(ChangeKind::Delete, None, Some(old)));
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, row: Row, conflict_key: &str) -> AppResult<Row> {
        self.before_write().await?;
        expect_object(&row)?;

        let key = row
            .get(conflict_key)
            .cloned()
            .ok_or_else(|| AppError::validation(format!("Row is missing '{conflict_key}'")))?;

        let event = {
            let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
            let rows = tables.entry(collection.to_string()).or_default();
            match rows.iter_mut().find(|r| r.get(conflict_key) == Some(&key)) {
                Some(existing) => {
                    let old = std::mem::replace(existing, row.clone());
                    ChangeEvent::new(ChangeKind::Update, Some(row.clone()), Some(old))
                }
                None => {
                    rows.push(row.clone());
                    ChangeEvent::new(ChangeKind::Insert, Some(row.clone()), None)
                }
            }
        };

        self.publish(collection, event);
        Ok(row)
    }

    async fn invoke(&self, function: &str, payload: Row) -> AppResult<Row> {
        self.invocations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((function.to_string(), payload.clone()));

        let handler = self
            .functions
            .get(function)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                AppError::external_service(format!("Function '{function}' is not deployed"))
            })?;

        handler(payload)
    }
}

#[async_trait]
impl RealtimeSource for MemoryBackend {
    async fn subscribe(&self, collection: &str, filter: &str) -> AppResult<Subscription> {
        if self.faults.fail_subscribe.load(Ordering::SeqCst) {
            return Err(AppError::service_unavailable("Realtime channel unavailable"));
        }

        let filter = if filter.is_empty() {
            None
        } else {
            Some(FilterField::parse_expression(filter).ok_or_else(|| {
                AppError::validation(format!("Invalid subscription filter '{filter}'"))
            })?)
        };

        let (tx, rx) = mpsc::channel(self.buffer_size);
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.subscribers.insert(
            handle.0,
            Subscriber {
                collection: collection.to_string(),
                filter,
                tx,
            },
        );

        debug!(%handle, collection, "Memory subscription opened");
        Ok(Subscription { handle, events: rx })
    }

    async fn unsubscribe(&self, handle: SubscriptionHandle) {
        if self.subscribers.remove(&handle.0).is_some() {
            debug!(%handle, "Memory subscription closed");
        }
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn current_user(&self) -> AppResult<Option<UserIdentity>> {
        Ok(self
            .current_user
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    async fn sign_out(&self) -> AppResult<()> {
        let mut user = self.current_user.write().unwrap_or_else(|e| e.into_inner());
        *user = None;
        Ok(())
    }
}
