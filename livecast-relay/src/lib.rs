//! The relay core: subscriber directory + fan-out hub, the shared upstream
//! connection registry, and the session controller that ties them together.

pub mod controller;
pub mod error;
pub mod hub;
pub mod registry;

pub use controller::RelayController;
pub use error::{RelayError, Result};
pub use hub::{MessageSender, StreamerHub, Subscriber};
pub use registry::{ConnectionState, UpstreamConnection, UpstreamRegistry};
