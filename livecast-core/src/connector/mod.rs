//! Upstream connector boundary.
//!
//! All platform protocol handling (handshakes, wire parsing, auth) lives
//! behind [`LiveConnector`]: the relay asks it for one event session per
//! streamer and consumes typed [`UpstreamEvent`]s. The relay never sees the
//! platform wire format.

pub mod mock;

pub use mock::MockConnector;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::event::UpstreamEvent;
use crate::models::StreamerId;

/// Connector error types
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("connect to \"{streamer}\" failed: {reason}")]
    ConnectFailed { streamer: String, reason: String },

    #[error("unknown upstream provider: {0}")]
    UnknownProvider(String),
}

/// A live event session for a single streamer.
///
/// Created by [`LiveConnector::connect`] after a successful handshake.
/// Events arrive in platform order; the stream ends when the upstream goes
/// away or [`UpstreamSession::disconnect`] is called. Dropping the session
/// also releases the upstream connection.
#[derive(Debug)]
pub struct UpstreamSession {
    events: mpsc::UnboundedReceiver<UpstreamEvent>,
    cancel: CancellationToken,
}

impl UpstreamSession {
    #[must_use]
    pub fn new(events: mpsc::UnboundedReceiver<UpstreamEvent>, cancel: CancellationToken) -> Self {
        Self { events, cancel }
    }

    /// Receive the next upstream event. Returns `None` once the session has
    /// ended.
    pub async fn recv(&mut self) -> Option<UpstreamEvent> {
        self.events.recv().await
    }

    /// Release upstream resources. Idempotent.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }
}

impl Drop for UpstreamSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Upstream platform connector.
///
/// One implementation per platform SDK. `connect` performs the handshake for
/// the given streamer and resolves with an event session, or with an error if
/// the streamer is offline or the handshake fails.
#[async_trait]
pub trait LiveConnector: Send + Sync {
    /// Provider name (e.g. "mock")
    fn name(&self) -> &'static str;

    /// Open a live event session for `streamer`.
    async fn connect(&self, streamer: &StreamerId) -> Result<UpstreamSession, ConnectorError>;
}
