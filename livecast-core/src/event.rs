use serde::{Deserialize, Serialize};

/// Raw events emitted by an upstream platform session for a single streamer.
///
/// Field names mirror the platform SDK payloads (`nickname`, `comment`,
/// `diamond_count`, ...); the relay never puts these on the wire directly,
/// they are mapped to [`OutboundMessage`] by the normalizer first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEvent {
    Chat {
        nickname: String,
        comment: String,
    },
    Gift {
        nickname: String,
        gift_name: String,
        /// Platform gift type code; type 1 gifts can streak.
        gift_type: i32,
        repeat_count: u32,
        /// True once the platform reports the streak as finished.
        repeat_end: bool,
        /// Per-gift value in platform currency (diamonds).
        diamond_count: u32,
    },
    RoomUser {
        viewer_count: u64,
    },
    Like {
        total_like_count: u64,
    },
    Subscribe {
        nickname: String,
    },
    Follow {
        nickname: String,
    },
    Share {
        nickname: String,
    },
}

impl UpstreamEvent {
    /// Get a short description of the event kind
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::Gift { .. } => "gift",
            Self::RoomUser { .. } => "room_user",
            Self::Like { .. } => "like",
            Self::Subscribe { .. } => "subscribe",
            Self::Follow { .. } => "follow",
            Self::Share { .. } => "share",
        }
    }
}

/// Outcome of an upstream connect attempt, relayed to subscribers as a
/// `connectedStatus` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectStatus {
    Connected,
    Failed,
}

/// Gift streak phase.
///
/// `InProgress` messages are transient and may repeat as the streak count
/// grows; only `Ended` carries the final repeat count and should be treated
/// as a completed gift by accounting clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GiftPhase {
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "ended")]
    Ended,
}

/// Normalized messages fanned out to subscribers, one JSON object per
/// message. The serde representation is the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OutboundMessage {
    ConnectedStatus {
        status: ConnectStatus,
    },
    Chat {
        username: String,
        message: String,
    },
    Gift {
        username: String,
        gift_name: String,
        repeat_count: u32,
        value: u32,
        message: GiftPhase,
    },
    ViewerCount {
        count: u64,
    },
    LikeCount {
        count: u64,
    },
    Social {
        username: String,
        message: String,
    },
}

impl OutboundMessage {
    /// Get the wire `type` tag of this message
    #[must_use]
    pub const fn message_type(&self) -> &'static str {
        match self {
            Self::ConnectedStatus { .. } => "connectedStatus",
            Self::Chat { .. } => "chat",
            Self::Gift { .. } => "gift",
            Self::ViewerCount { .. } => "viewerCount",
            Self::LikeCount { .. } => "likeCount",
            Self::Social { .. } => "social",
        }
    }
}
