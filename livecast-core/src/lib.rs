//! Core types for the Livecast relay: streamer/connection identifiers,
//! upstream and outbound event shapes, the upstream connector boundary,
//! and the shared configuration/logging plumbing.

pub mod config;
pub mod connector;
pub mod event;
pub mod logging;
pub mod models;
pub mod normalize;

pub use config::Config;
pub use event::{ConnectStatus, GiftPhase, OutboundMessage, UpstreamEvent};
pub use models::{ConnectionId, StreamerId};
