//! Error types for the relay core

use livecast_core::models::{ConnectionId, StreamerId};
use thiserror::Error;

/// Relay error types
#[derive(Debug, Error)]
pub enum RelayError {
    /// A subscriber may watch exactly one streamer for the lifetime of its
    /// connection; a second watch request is rejected.
    #[error("connection {connection} is already watching \"{streamer}\"")]
    AlreadyWatching {
        connection: ConnectionId,
        streamer: StreamerId,
    },
}

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
