//! Registry of shared upstream connections, one per streamer.
//!
//! Connections are created lazily on the first watch request and reused by
//! every later subscriber of the same streamer. A per-streamer creation lock
//! with double-checked lookup guarantees at most one connection exists even
//! when watch requests race. Each connection owns a driver task that performs
//! the upstream handshake and pumps events through the normalizer into the
//! hub, in platform order.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use livecast_core::connector::LiveConnector;
use livecast_core::event::{ConnectStatus, OutboundMessage};
use livecast_core::models::StreamerId;
use livecast_core::normalize::normalize;

use crate::hub::StreamerHub;

/// Upstream connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Failed,
    Closed,
}

/// A shared upstream connection for one streamer.
///
/// Owned by the registry entry for its streamer; subscribers never hold it
/// beyond the acquire call. The handshake outcome is reported asynchronously
/// as a `connectedStatus` broadcast, never as a synchronous result.
pub struct UpstreamConnection {
    streamer: StreamerId,
    state: Mutex<ConnectionState>,
    cancel: CancellationToken,
}

impl UpstreamConnection {
    fn new(streamer: StreamerId) -> Self {
        Self {
            streamer,
            state: Mutex::new(ConnectionState::Connecting),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn streamer(&self) -> &StreamerId {
        &self.streamer
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Record a driver-side transition. `Closed` is terminal and never
    /// overwritten.
    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.lock();
        if *state != ConnectionState::Closed {
            *state = next;
        }
    }

    /// Tear down: stop the driver task and release upstream resources.
    /// Idempotent.
    fn shutdown(&self) {
        *self.state.lock() = ConnectionState::Closed;
        self.cancel.cancel();
    }
}

/// Registry mapping each streamer to its single shared upstream connection.
pub struct UpstreamRegistry {
    connector: Arc<dyn LiveConnector>,
    hub: StreamerHub,

    /// Map of streamer -> live upstream connection
    connections: DashMap<StreamerId, Arc<UpstreamConnection>>,

    /// Per-streamer creation locks, held only across check-and-create
    creation_locks: DashMap<StreamerId, Arc<tokio::sync::Mutex<()>>>,
}

impl UpstreamRegistry {
    #[must_use]
    pub fn new(connector: Arc<dyn LiveConnector>, hub: StreamerHub) -> Self {
        Self {
            connector,
            hub,
            connections: DashMap::new(),
            creation_locks: DashMap::new(),
        }
    }

    /// Get the existing connection for `streamer`, or create one.
    ///
    /// The returned connection may still be `Connecting`; the handshake
    /// outcome arrives later as a `connectedStatus` broadcast. At most one
    /// connection is ever created per streamer, even under concurrent calls.
    pub async fn acquire(&self, streamer: &StreamerId) -> Arc<UpstreamConnection> {
        // Fast path: reuse the live entry, no lock needed
        if let Some(existing) = self.connections.get(streamer) {
            if !existing.is_closed() {
                return existing.clone();
            }
        }

        let lock = self
            .creation_locks
            .entry(streamer.clone())
            .or_default()
            .clone();
        let _guard = lock.lock().await;

        // Re-check after acquiring the lock: a concurrent caller may have won
        if let Some(existing) = self.connections.get(streamer) {
            if !existing.is_closed() {
                debug!(streamer = %streamer, "Reusing upstream connection created by concurrent request");
                return existing.clone();
            }
            drop(existing);
            self.connections.remove(streamer);
        }

        let conn = Arc::new(UpstreamConnection::new(streamer.clone()));
        tokio::spawn(drive(
            Arc::clone(&self.connector),
            self.hub.clone(),
            Arc::clone(&conn),
        ));
        self.connections.insert(streamer.clone(), Arc::clone(&conn));

        info!(streamer = %streamer, "Upstream connection created");
        conn
    }

    /// Tear down and remove the connection for `streamer`. Idempotent.
    pub fn release(&self, streamer: &StreamerId) {
        if let Some((_, conn)) = self.connections.remove(streamer) {
            conn.shutdown();
            info!(streamer = %streamer, "Upstream connection released");
        }
    }

    /// Get the connection for `streamer`, if registered.
    #[must_use]
    pub fn get(&self, streamer: &StreamerId) -> Option<Arc<UpstreamConnection>> {
        self.connections.get(streamer).map(|c| Arc::clone(c.value()))
    }

    /// Whether a connection is registered for `streamer`.
    #[must_use]
    pub fn is_registered(&self, streamer: &StreamerId) -> bool {
        self.connections.contains_key(streamer)
    }

    /// Number of registered upstream connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// Driver task for one upstream connection: handshake, then pump events into
/// the hub until torn down or the upstream ends.
async fn drive(connector: Arc<dyn LiveConnector>, hub: StreamerHub, conn: Arc<UpstreamConnection>) {
    let streamer = conn.streamer.clone();
    let cancel = conn.cancel.clone();

    let connect_result = tokio::select! {
        () = cancel.cancelled() => {
            debug!(streamer = %streamer, "Upstream released before connect finished");
            return;
        }
        result = connector.connect(&streamer) => result,
    };

    let mut session = match connect_result {
        Ok(session) => {
            conn.set_state(ConnectionState::Connected);
            info!(streamer = %streamer, "Connected to upstream");
            hub.broadcast(
                &streamer,
                &OutboundMessage::ConnectedStatus {
                    status: ConnectStatus::Connected,
                },
            );
            session
        }
        Err(err) => {
            // The failed entry stays registered (no retry) until its
            // subscribers drain.
            conn.set_state(ConnectionState::Failed);
            error!(streamer = %streamer, error = %err, "Failed to connect to upstream");
            hub.broadcast(
                &streamer,
                &OutboundMessage::ConnectedStatus {
                    status: ConnectStatus::Failed,
                },
            );
            return;
        }
    };

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                session.disconnect();
                debug!(streamer = %streamer, "Upstream session torn down");
                break;
            }
            event = session.recv() => match event {
                Some(event) => {
                    hub.broadcast(&streamer, &normalize(event));
                }
                None => {
                    debug!(streamer = %streamer, "Upstream event stream ended");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::MessageSender;
    use livecast_core::connector::MockConnector;
    use livecast_core::event::{GiftPhase, UpstreamEvent};
    use livecast_core::models::ConnectionId;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn setup() -> (Arc<MockConnector>, StreamerHub, UpstreamRegistry) {
        let connector = Arc::new(MockConnector::new());
        let hub = StreamerHub::new();
        let registry = UpstreamRegistry::new(connector.clone(), hub.clone());
        (connector, hub, registry)
    }

    fn attach(hub: &StreamerHub, streamer: &StreamerId) -> mpsc::UnboundedReceiver<OutboundMessage> {
        let (tx, rx): (MessageSender, _) = mpsc::unbounded_channel();
        hub.associate(ConnectionId::new(), streamer.clone(), tx)
            .unwrap();
        rx
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..100 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_concurrent_acquires_create_one_connection() {
        let (connector, hub, registry) = setup();
        let streamer = StreamerId::from("alice");
        let mut rx = attach(&hub, &streamer);

        let (a, b, c) = tokio::join!(
            registry.acquire(&streamer),
            registry.acquire(&streamer),
            registry.acquire(&streamer),
        );
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
        assert_eq!(registry.connection_count(), 1);

        // Handshake outcome arrives asynchronously as a broadcast
        let status = rx.recv().await.unwrap();
        assert_eq!(
            status,
            OutboundMessage::ConnectedStatus {
                status: ConnectStatus::Connected,
            }
        );
        assert_eq!(connector.connect_count(&streamer), 1);
        assert_eq!(a.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_release_is_idempotent_and_tears_down() {
        let (connector, hub, registry) = setup();
        let streamer = StreamerId::from("alice");
        let mut rx = attach(&hub, &streamer);

        let conn = registry.acquire(&streamer).await;
        rx.recv().await.unwrap(); // connected

        registry.release(&streamer);
        assert!(!registry.is_registered(&streamer));
        assert!(conn.is_closed());

        // Driver drops the session once it observes the cancellation
        wait_until(|| !connector.is_connected(&streamer)).await;

        // Releasing an already-released streamer is a no-op
        registry.release(&streamer);
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_reacquire_after_release_creates_fresh_connection() {
        let (connector, hub, registry) = setup();
        let streamer = StreamerId::from("alice");
        let mut rx = attach(&hub, &streamer);

        let first = registry.acquire(&streamer).await;
        rx.recv().await.unwrap();
        registry.release(&streamer);

        let second = registry.acquire(&streamer).await;
        rx.recv().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connect_count(&streamer), 2);
        assert_eq!(second.state(), ConnectionState::Connected);
        assert!(first.is_closed());
    }

    #[tokio::test]
    async fn test_connect_failure_broadcasts_failed_and_stays_registered() {
        let (connector, hub, registry) = setup();
        connector.fail_streamer("offline");
        let streamer = StreamerId::from("offline");
        let mut rx = attach(&hub, &streamer);

        let conn = registry.acquire(&streamer).await;

        let status = rx.recv().await.unwrap();
        assert_eq!(
            status,
            OutboundMessage::ConnectedStatus {
                status: ConnectStatus::Failed,
            }
        );
        assert_eq!(conn.state(), ConnectionState::Failed);
        assert!(registry.is_registered(&streamer));

        // A later acquire reuses the failed entry instead of reconnecting
        let again = registry.acquire(&streamer).await;
        assert!(Arc::ptr_eq(&conn, &again));
        assert_eq!(connector.connect_count(&streamer), 1);
    }

    #[tokio::test]
    async fn test_events_flow_normalized_and_in_order() {
        let (connector, hub, registry) = setup();
        let streamer = StreamerId::from("alice");
        let mut rx = attach(&hub, &streamer);

        registry.acquire(&streamer).await;
        rx.recv().await.unwrap(); // connected

        let gift = |repeat_end, repeat_count| UpstreamEvent::Gift {
            nickname: "carol".to_string(),
            gift_name: "Rose".to_string(),
            gift_type: 1,
            repeat_count,
            repeat_end,
            diamond_count: 1,
        };
        assert!(connector.emit(&streamer, gift(false, 3)));
        assert!(connector.emit(&streamer, gift(true, 7)));

        match rx.recv().await.unwrap() {
            OutboundMessage::Gift {
                repeat_count,
                message,
                ..
            } => {
                assert_eq!(repeat_count, 3);
                assert_eq!(message, GiftPhase::InProgress);
            }
            other => panic!("Expected Gift, got {other:?}"),
        }
        match rx.recv().await.unwrap() {
            OutboundMessage::Gift {
                repeat_count,
                message,
                ..
            } => {
                assert_eq!(repeat_count, 7);
                assert_eq!(message, GiftPhase::Ended);
            }
            other => panic!("Expected Gift, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upstream_end_leaves_entry_until_release() {
        let (connector, hub, registry) = setup();
        let streamer = StreamerId::from("alice");
        let mut rx = attach(&hub, &streamer);

        registry.acquire(&streamer).await;
        rx.recv().await.unwrap();

        connector.end_session(&streamer);
        wait_until(|| !connector.is_connected(&streamer)).await;

        // No retry policy: the entry lingers until subscribers drain
        assert!(registry.is_registered(&streamer));
        registry.release(&streamer);
        assert!(!registry.is_registered(&streamer));
    }
}
