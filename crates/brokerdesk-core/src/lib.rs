//! # brokerdesk-core
//!
//! Core crate for BrokerDesk. Contains the backend contract traits
//! (data gateway, realtime source, auth), configuration schemas,
//! query/filter/sorting/pagination types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other BrokerDesk crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
