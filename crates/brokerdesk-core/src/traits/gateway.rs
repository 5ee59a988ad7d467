//! Data gateway trait for the hosted row store and callable functions.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::query::Query;

/// A raw row as exchanged with the backend.
pub type Row = serde_json::Value;

/// Trait for hosted data backends.
///
/// Rows are untyped JSON objects; typed decoding happens in the view layer.
/// Row-level authorization is the backend's responsibility. Implementations
/// must report failures as errors rather than empty results so that callers
/// can tell a failed query from an empty one.
#[async_trait]
pub trait DataGateway: Send + Sync + std::fmt::Debug + 'static {
    /// Short provider name for logging (`"memory"`, `"rest"`).
    fn provider_type(&self) -> &str;

    /// Return rows of `collection` matching `query`.
    async fn query(&self, collection: &str, query: &Query) -> AppResult<Vec<Row>>;

    /// Insert a row and return it as stored.
    async fn insert(&self, collection: &str, row: Row) -> AppResult<Row>;

    /// Apply `patch` to the row with the given id and return the result.
    async fn update(&self, collection: &str, id: &str, patch: Row) -> AppResult<Row>;

    /// Delete the row with the given id. Deleting a missing row succeeds.
    async fn delete(&self, collection: &str, id: &str) -> AppResult<()>;

    /// Insert the row, or replace the existing row with the same
    /// `conflict_key` value.
    async fn upsert(&self, collection: &str, row: Row, conflict_key: &str) -> AppResult<Row>;

    /// Invoke a callable server function.
    async fn invoke(&self, function: &str, payload: Row) -> AppResult<Row>;
}
