//! Workspace-level scenarios run against the in-memory backend.

mod helpers;

mod favorite_test;
mod filter_test;
mod intake_test;
mod notification_test;
mod selection_test;
