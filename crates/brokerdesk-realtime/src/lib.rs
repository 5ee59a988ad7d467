//! # brokerdesk-realtime
//!
//! Pushes backend row changes into collection stores as they happen.
//! A [`DeliveryAdapter`] subscribes to one collection for the session
//! user, upserts inserted and updated rows, removes deleted ones, raises
//! an [`Alert`] for high-priority inserts, and reconnects with
//! [`Backoff`] when the channel drops. Malformed payloads are logged and
//! skipped without ending the subscription.

pub mod adapter;
pub mod alert;
pub mod backoff;
pub mod change;

pub use adapter::DeliveryAdapter;
pub use alert::Alert;
pub use backoff::Backoff;
pub use change::{Delivery, decode};
