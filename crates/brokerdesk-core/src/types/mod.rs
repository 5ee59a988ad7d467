//! Core type definitions used across the BrokerDesk workspace.

pub mod filter;
pub mod pagination;
pub mod query;
pub mod sorting;

pub use filter::{FilterField, FilterOp, FilterValue};
pub use pagination::PageRequest;
pub use query::Query;
pub use sorting::{SortDirection, SortField};
