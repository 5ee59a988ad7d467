//! Result alias shared by the BrokerDesk crates.

use crate::error::AppError;

/// Result of any fallible BrokerDesk operation.
pub type AppResult<T> = Result<T, AppError>;
