//! Inbound subscriber protocol: one JSON object per message.
//!
//! `connectStreamer` is the only recognized message. Anything else —
//! malformed JSON, unknown `type`, missing fields — is dropped without a
//! response, and the connection stays usable.

use serde::Deserialize;
use tracing::debug;

/// Messages a subscriber may send to the relay
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Watch a streamer's live events
    ConnectStreamer { username: String },
}

impl ClientMessage {
    /// Parse an inbound text frame leniently.
    ///
    /// Returns `None` for anything that is not a well-formed recognized
    /// message.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(message) => Some(message),
            Err(err) => {
                debug!(error = %err, "Ignoring malformed subscriber message");
                None
            }
        }
    }
}
