//! Backend contract traits defined in `brokerdesk-core` and implemented by
//! the gateway crate.

pub mod auth;
pub mod gateway;
pub mod realtime;

pub use auth::{AuthProvider, UserIdentity};
pub use gateway::{DataGateway, Row};
pub use realtime::{ChangeEvent, ChangeKind, RealtimeSource, Subscription, SubscriptionHandle};
