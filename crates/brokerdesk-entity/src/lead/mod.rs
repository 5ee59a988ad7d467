//! Lead pipeline entities.

pub mod model;
pub mod status;

pub use model::Lead;
pub use status::LeadStatus;
