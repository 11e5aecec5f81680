//! Change publishing.
//!
//! A publish reads the subscriber map of one key, removes entries older than
//! the freshness window, and pushes a [`ChangeMessage`] to the channel of
//! every remaining session. Delivery goes through a [`Transport`]; with the
//! [`NullTransport`] nothing is sent but scrubbing still happens.

mod message;
mod publisher;
mod transport;

pub use message::{Cause, ChangeMessage};
pub use publisher::{partition_subscribers, Publisher};
pub use transport::{ChannelReceiver, Delivery, LocalTransport, NullTransport, Transport};
