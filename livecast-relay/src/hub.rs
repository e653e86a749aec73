use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use livecast_core::event::OutboundMessage;
use livecast_core::models::{ConnectionId, StreamerId};

use crate::error::RelayError;

/// Message sender for a subscriber connection
pub type MessageSender = mpsc::UnboundedSender<OutboundMessage>;

/// Subscriber information
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub connection_id: ConnectionId,
    pub sender: MessageSender,
}

/// In-memory hub routing normalized messages to the subscribers of each
/// streamer.
///
/// Holds the subscriber directory (connection -> streamer, one streamer per
/// connection) and performs the fan-out. Delivery is best-effort: a
/// subscriber whose channel is gone is pruned and the broadcast continues.
#[derive(Clone, Default)]
pub struct StreamerHub {
    /// Map of streamer -> subscribers watching it
    streamers: Arc<DashMap<StreamerId, Vec<Subscriber>>>,

    /// Map of connection_id -> streamer, for exclusive association and cleanup
    connections: Arc<DashMap<ConnectionId, StreamerId>>,
}

impl StreamerHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `connection_id` with `streamer`, registering `sender` for
    /// fan-out.
    ///
    /// A connection watches exactly one streamer; a second association is
    /// rejected with [`RelayError::AlreadyWatching`] and leaves the existing
    /// one untouched.
    pub fn associate(
        &self,
        connection_id: ConnectionId,
        streamer: StreamerId,
        sender: MessageSender,
    ) -> Result<(), RelayError> {
        if let Some(current) = self.connections.get(&connection_id) {
            return Err(RelayError::AlreadyWatching {
                connection: connection_id.clone(),
                streamer: current.value().clone(),
            });
        }

        let subscriber = Subscriber {
            connection_id: connection_id.clone(),
            sender,
        };

        self.streamers
            .entry(streamer.clone())
            .or_default()
            .push(subscriber);
        self.connections
            .insert(connection_id.clone(), streamer.clone());

        info!(
            streamer = %streamer,
            connection_id = %connection_id,
            "Subscriber associated with streamer"
        );

        Ok(())
    }

    /// Remove `connection_id` from whatever streamer it watches.
    ///
    /// Returns the streamer it was removed from, or `None` if it was not
    /// associated.
    pub fn disassociate(&self, connection_id: &ConnectionId) -> Option<StreamerId> {
        let (_, streamer) = self.connections.remove(connection_id)?;

        if let Some(mut subscribers) = self.streamers.get_mut(&streamer) {
            subscribers.retain(|sub| sub.connection_id != *connection_id);

            if subscribers.is_empty() {
                drop(subscribers); // Drop the RefMut before removing
                self.streamers.remove(&streamer);
                debug!(streamer = %streamer, "Streamer has no more subscribers, removed");
            }
        }

        info!(
            streamer = %streamer,
            connection_id = %connection_id,
            "Subscriber disassociated from streamer"
        );

        Some(streamer)
    }

    /// Snapshot of the subscribers currently watching `streamer`.
    #[must_use]
    pub fn subscribers_of(&self, streamer: &StreamerId) -> Vec<Subscriber> {
        self.streamers
            .get(streamer)
            .map(|subscribers| subscribers.value().clone())
            .unwrap_or_default()
    }

    /// Broadcast a message to all subscribers of a streamer.
    ///
    /// Returns the number of subscribers the message was handed to. Send
    /// failures are isolated per subscriber: the failed connection is pruned
    /// and delivery to the rest continues.
    pub fn broadcast(&self, streamer: &StreamerId, message: &OutboundMessage) -> usize {
        let mut sent_count = 0;
        let mut failed_connections = Vec::new();

        if let Some(subscribers) = self.streamers.get(streamer) {
            for subscriber in subscribers.iter() {
                match subscriber.sender.send(message.clone()) {
                    Ok(()) => {
                        sent_count += 1;
                    }
                    Err(err) => {
                        warn!(
                            streamer = %streamer,
                            connection_id = %subscriber.connection_id,
                            error = %err,
                            "Failed to send message to subscriber, marking for cleanup"
                        );
                        failed_connections.push(subscriber.connection_id.clone());
                    }
                }
            }
        }

        // Clean up failed connections
        for conn_id in failed_connections {
            self.disassociate(&conn_id);
        }

        if sent_count > 0 {
            debug!(
                streamer = %streamer,
                sent_count = sent_count,
                message_type = %message.message_type(),
                "Broadcast complete"
            );
        }

        sent_count
    }

    /// Get the number of subscribers watching a streamer
    #[must_use]
    pub fn subscriber_count(&self, streamer: &StreamerId) -> usize {
        self.streamers
            .get(streamer)
            .map_or(0, |subscribers| subscribers.len())
    }

    /// Get the number of streamers with at least one subscriber
    #[must_use]
    pub fn streamer_count(&self) -> usize {
        self.streamers.len()
    }

    /// Get total number of associated connections
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
