//! Session controller: the subscriber-facing lifecycle.
//!
//! All registry and directory mutation funnels through this controller. A
//! subscriber connection starts unassociated, becomes watching on its first
//! valid watch request, and is cleaned up on transport close; the last
//! subscriber of a streamer draining releases that streamer's upstream
//! connection.

use std::sync::Arc;
use tracing::{debug, info};

use livecast_core::connector::LiveConnector;
use livecast_core::models::{ConnectionId, StreamerId};

use crate::error::RelayError;
use crate::hub::{MessageSender, StreamerHub};
use crate::registry::UpstreamRegistry;

/// Orchestrates the subscriber directory and the upstream registry.
pub struct RelayController {
    hub: StreamerHub,
    registry: UpstreamRegistry,
}

impl RelayController {
    #[must_use]
    pub fn new(connector: Arc<dyn LiveConnector>) -> Self {
        let hub = StreamerHub::new();
        let registry = UpstreamRegistry::new(connector, hub.clone());
        Self { hub, registry }
    }

    #[must_use]
    pub fn hub(&self) -> &StreamerHub {
        &self.hub
    }

    #[must_use]
    pub fn registry(&self) -> &UpstreamRegistry {
        &self.registry
    }

    /// Handle a watch request: associate the subscriber with `streamer` and
    /// make sure the shared upstream connection exists.
    ///
    /// The association happens first so a rejected duplicate watch can never
    /// create (or leak) an upstream connection, and so the subscriber is
    /// already in the fan-out set when the handshake outcome is broadcast.
    pub async fn watch(
        &self,
        connection_id: &ConnectionId,
        streamer: StreamerId,
        sender: MessageSender,
    ) -> Result<(), RelayError> {
        self.hub
            .associate(connection_id.clone(), streamer.clone(), sender)?;
        self.registry.acquire(&streamer).await;

        info!(
            connection_id = %connection_id,
            streamer = %streamer,
            "Subscriber watching streamer"
        );
        Ok(())
    }

    /// Handle a subscriber transport close.
    ///
    /// Removes the subscriber from the directory; if it was the last one for
    /// its streamer, the upstream connection is released.
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        let Some(streamer) = self.hub.disassociate(connection_id) else {
            debug!(connection_id = %connection_id, "Unassociated subscriber closed");
            return;
        };

        if self.hub.subscriber_count(&streamer) == 0 {
            self.registry.release(&streamer);
            info!(
                streamer = %streamer,
                "Last subscriber left, upstream connection released"
            );
        }
    }
}
