//! Downstream subscriber transport: the WebSocket endpoint and the inbound
//! message protocol.

pub mod http;
pub mod protocol;

pub use http::{router, AppState};
