//! Business-for-sale listing entities.

pub mod kind;
pub mod model;

pub use kind::{Industry, ListingStatus};
pub use model::Business;
