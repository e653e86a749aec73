//! Scripted in-process connector.
//!
//! Used by the test suites and selectable via `upstream.provider = "mock"`
//! for local development: sessions connect instantly and relay whatever the
//! owner injects with [`MockConnector::emit`].

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ConnectorError, LiveConnector, UpstreamSession};
use crate::event::UpstreamEvent;
use crate::models::StreamerId;

/// Connector whose sessions are driven by the test/caller.
#[derive(Default)]
pub struct MockConnector {
    /// Streamers whose handshake is scripted to fail.
    failing: DashSet<StreamerId>,
    /// Event injectors for live sessions.
    sessions: DashMap<StreamerId, mpsc::UnboundedSender<UpstreamEvent>>,
    /// Connect attempts per streamer, successful or not.
    connect_counts: DashMap<StreamerId, usize>,
}

impl MockConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script subsequent connect attempts for `streamer` to fail.
    pub fn fail_streamer(&self, streamer: impl Into<StreamerId>) {
        self.failing.insert(streamer.into());
    }

    /// Inject an upstream event into the live session for `streamer`.
    ///
    /// Returns `false` if no session is live for that streamer.
    pub fn emit(&self, streamer: &StreamerId, event: UpstreamEvent) -> bool {
        match self.sessions.get(streamer) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// End the live session for `streamer` from the upstream side.
    pub fn end_session(&self, streamer: &StreamerId) {
        self.sessions.remove(streamer);
    }

    /// Number of connect attempts seen for `streamer`.
    #[must_use]
    pub fn connect_count(&self, streamer: &StreamerId) -> usize {
        self.connect_counts.get(streamer).map_or(0, |c| *c)
    }

    /// Whether a session for `streamer` is currently live and consumed.
    #[must_use]
    pub fn is_connected(&self, streamer: &StreamerId) -> bool {
        self.sessions.get(streamer).is_some_and(|tx| !tx.is_closed())
    }
}

#[async_trait]
impl LiveConnector for MockConnector {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&self, streamer: &StreamerId) -> Result<UpstreamSession, ConnectorError> {
        *self.connect_counts.entry(streamer.clone()).or_insert(0) += 1;

        if self.failing.contains(streamer) {
            debug!(streamer = %streamer, "Mock connect scripted to fail");
            return Err(ConnectorError::ConnectFailed {
                streamer: streamer.to_string(),
                reason: "scripted failure".to_string(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        // Replaces any previous (now closed) session for the same streamer.
        self.sessions.insert(streamer.clone(), tx);
        debug!(streamer = %streamer, "Mock session connected");

        Ok(UpstreamSession::new(rx, CancellationToken::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_and_emit() {
        let connector = MockConnector::new();
        let streamer = StreamerId::from("alice");

        let mut session = connector.connect(&streamer).await.unwrap();
        assert!(connector.is_connected(&streamer));
        assert_eq!(connector.connect_count(&streamer), 1);

        assert!(connector.emit(
            &streamer,
            UpstreamEvent::Chat {
                nickname: "bob".to_string(),
                comment: "hi".to_string(),
            },
        ));

        let event = session.recv().await.unwrap();
        assert_eq!(event.kind(), "chat");
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let connector = MockConnector::new();
        connector.fail_streamer("offline");

        let err = connector
            .connect(&StreamerId::from("offline"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::ConnectFailed { .. }));
        assert_eq!(connector.connect_count(&StreamerId::from("offline")), 1);
    }

    #[tokio::test]
    async fn test_dropped_session_is_no_longer_connected() {
        let connector = MockConnector::new();
        let streamer = StreamerId::from("alice");

        let session = connector.connect(&streamer).await.unwrap();
        drop(session);

        assert!(!connector.is_connected(&streamer));
        assert!(!connector.emit(
            &streamer,
            UpstreamEvent::Like {
                total_like_count: 1
            },
        ));
    }

    #[tokio::test]
    async fn test_upstream_side_end_closes_event_stream() {
        let connector = MockConnector::new();
        let streamer = StreamerId::from("alice");

        let mut session = connector.connect(&streamer).await.unwrap();
        connector.end_session(&streamer);

        assert_eq!(session.recv().await, None);
    }
}
