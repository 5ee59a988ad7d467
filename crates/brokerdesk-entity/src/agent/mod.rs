//! Agent directory entities.

pub mod model;

pub use model::{Agent, AgentSpecialty};
