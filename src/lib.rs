//! # Record PubSub
//!
//! Change-notification fan-out for record-backed applications: tracks which
//! client sessions have read which records, associations and scopes, and
//! pushes a change message to exactly those sessions when the data mutates.
//!
//! ## Core Concepts
//!
//! - **Subscription keys**: one store hash per record, relation or scope,
//!   mapping session id to last refresh time
//! - **Registrar**: every read is an implicit subscribe
//! - **Publisher**: every write is a publish; stale subscribers are pruned
//!   lazily on publish
//! - **Transports**: channel-addressed delivery behind a trait, with a null
//!   default and an in-process implementation
//!
//! ## Example
//!
//! ```ignore
//! use record_pubsub::{FixedSession, LocalTransport, MemoryStore, PubSub, RecordRef};
//! use std::sync::Arc;
//!
//! let transport = Arc::new(LocalTransport::new());
//! let pubsub = PubSub::new(
//!     Arc::new(MemoryStore::new()),
//!     transport.clone(),
//!     Arc::new(FixedSession::new("s1")),
//! );
//! let inbox = transport.open(pubsub.config().channel_for("s1"));
//!
//! // Called from the ORM's after-save hook
//! pubsub.pub_sub_record(&RecordRef::new("Post", 42));
//!
//! let delivery = inbox.recv()?;
//! assert_eq!(delivery.payload["record_type"], "Post");
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod publish;
pub mod pubsub;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PubSubConfig;
pub use error::{PubSubError, Result};
pub use publish::{
    partition_subscribers, Cause, ChangeMessage, ChannelReceiver, Delivery, LocalTransport,
    NullTransport, Publisher, Transport,
};
pub use pubsub::PubSub;
pub use subscriptions::{
    FieldSet, FixedSession, MemoryStore, Registrar, SessionProvider, StoreBatch,
    SubscriptionStore,
};
pub use types::*;
