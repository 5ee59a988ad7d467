//! Remote query description.

use serde::{Deserialize, Serialize};

use super::filter::FilterField;
use super::pagination::PageRequest;
use super::sorting::SortField;

/// A query over a named collection: ANDed filters, ordering, pagination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Conditions that every returned row must satisfy.
    #[serde(default)]
    pub filters: Vec<FilterField>,
    /// Ordering applied by the backend.
    #[serde(default)]
    pub order: Option<SortField>,
    /// Page window, if any.
    #[serde(default)]
    pub page: Option<PageRequest>,
}

impl Query {
    /// An unconstrained query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition.
    pub fn filter(mut self, filter: FilterField) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add an equality filter.
    pub fn eq(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter(FilterField::eq(field, value))
    }

    /// Set the ordering.
    pub fn order_by(mut self, order: SortField) -> Self {
        self.order = Some(order);
        self
    }

    /// Set the page window.
    pub fn paginate(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }

    /// Whether the caller asked for a specific ordering.
    pub fn is_ordered(&self) -> bool {
        self.order.is_some()
    }
}
