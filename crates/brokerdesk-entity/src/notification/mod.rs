//! Notification domain entities.

pub mod kind;
pub mod model;
pub mod priority;

pub use kind::NotificationType;
pub use model::Notification;
pub use priority::NotificationPriority;
