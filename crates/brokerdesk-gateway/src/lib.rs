//! # brokerdesk-gateway
//!
//! Implementations of the backend contract traits from `brokerdesk-core`:
//!
//! - [`MemoryBackend`]: in-process row store, realtime fan-out, callable
//!   functions, and auth context, with fault injection for tests
//! - [`RestGateway`]: HTTP client for the hosted REST, auth, and function
//!   endpoints
//! - [`WsRealtimeSource`]: websocket client for the hosted realtime channel

pub mod memory;
pub mod rest;
pub mod row;
pub mod ws;

pub use memory::MemoryBackend;
pub use rest::RestGateway;
pub use ws::WsRealtimeSource;
