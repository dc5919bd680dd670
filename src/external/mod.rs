//! Provider-facing wire types and transports.

pub mod apple;
pub mod client;
pub mod google;
pub mod transport;

pub use transport::{FeedbackSource, MulticastTransport, UnaryTransport};
