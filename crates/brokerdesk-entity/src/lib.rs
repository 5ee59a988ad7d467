//! # brokerdesk-entity
//!
//! Domain entity models for BrokerDesk. Every struct in this crate
//! represents a backend row or a domain value object. Rows that appear in
//! list views implement [`Record`], which exposes the id, ordering
//! timestamp, and named field lookup used by the filter engine.

pub mod agent;
pub mod business;
pub mod favorite;
pub mod form;
pub mod lead;
pub mod notification;
pub mod record;
pub mod score;

pub use agent::{Agent, AgentSpecialty};
pub use business::{Business, Industry, ListingStatus};
pub use favorite::FavoriteRelation;
pub use lead::{Lead, LeadStatus};
pub use notification::{Notification, NotificationPriority, NotificationType};
pub use record::{FieldValue, Record};
pub use score::ScoreRecord;
