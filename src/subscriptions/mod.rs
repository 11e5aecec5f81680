//! Subscriber bookkeeping.
//!
//! Each subscription key maps session ids to the time that session last
//! read the keyed data:
//! - `record(kind, id)`: one record
//! - `relation(kind, id, name)`: one association of a record
//! - `scope(kind, name)`: a named class-level result set
//!
//! Keys appear on first subscribe. Stale entries are pruned by the
//! publisher, never by a background sweep.
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(MemoryStore::new());
//! let registrar = Registrar::new(store.clone(), Arc::new(SystemClock), "HRPS");
//!
//! registrar.subscribe_record(&RecordRef::new("Post", 42), Some("s1"))?;
//! assert!(store.contains_key(&SubscriptionKey::record("HRPS", "Post", "42")));
//! ```

mod registrar;
mod session;
mod store;

pub use registrar::Registrar;
pub use session::{FixedSession, SessionProvider};
pub use store::{FieldSet, MemoryStore, StoreBatch, SubscriptionStore};
