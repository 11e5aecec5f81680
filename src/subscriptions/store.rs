//! Subscription store contract and the in-process backend.

use crate::error::{PubSubError, Result};
use crate::types::{SubscriptionKey, Timestamp};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Hash-per-key store holding `session id -> last refresh` for every
/// subscription key.
///
/// Implementations must make single-field upserts and deletes atomic; no
/// cross-key atomicity is expected, batches included.
pub trait SubscriptionStore: Send + Sync {
    /// All fields of `key`. Empty if the key does not exist.
    fn get_all(&self, key: &SubscriptionKey) -> Result<HashMap<String, Timestamp>>;

    /// Upsert one field.
    fn set_field(&self, key: &SubscriptionKey, session: &str, refreshed: Timestamp) -> Result<()>;

    /// Remove one field. Removing a missing field is a no-op.
    fn delete_field(&self, key: &SubscriptionKey, session: &str) -> Result<()>;

    /// Remove the whole key.
    fn delete_key(&self, key: &SubscriptionKey) -> Result<()>;

    /// Apply every upsert in `batch` as one round trip.
    ///
    /// The default applies them one by one, for backends without pipelining.
    fn execute(&self, batch: &StoreBatch) -> Result<()> {
        for op in batch.iter() {
            self.set_field(&op.key, &op.session, op.refreshed)?;
        }
        Ok(())
    }
}

/// One pending upsert.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSet {
    pub key: SubscriptionKey,
    pub session: String,
    pub refreshed: Timestamp,
}

/// Upserts collected for one logical event, sent to the store together.
#[derive(Clone, Debug, Default)]
pub struct StoreBatch {
    ops: Vec<FieldSet>,
}

impl StoreBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_field(&mut self, key: SubscriptionKey, session: &str, refreshed: Timestamp) {
        self.ops.push(FieldSet {
            key,
            session: session.to_string(),
            refreshed,
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSet> {
        self.ops.iter()
    }
}

/// In-process subscription store.
///
/// Keys vanish once their last field is removed, matching Redis hashes.
pub struct MemoryStore {
    keys: RwLock<HashMap<SubscriptionKey, HashMap<String, Timestamp>>>,
    /// Calls served, batches counting once.
    round_trips: AtomicU64,
    /// When set, every call fails with `StoreUnavailable`.
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            round_trips: AtomicU64::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Snapshot of the key set, sorted.
    pub fn keys(&self) -> Vec<SubscriptionKey> {
        let mut keys: Vec<_> = self.keys.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn contains_key(&self, key: &SubscriptionKey) -> bool {
        self.keys.read().contains_key(key)
    }

    /// Store calls served so far.
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::SeqCst)
    }

    /// Simulate an outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn round_trip(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PubSubError::StoreUnavailable(
                "memory store marked unavailable".to_string(),
            ));
        }
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionStore for MemoryStore {
    fn get_all(&self, key: &SubscriptionKey) -> Result<HashMap<String, Timestamp>> {
        self.round_trip()?;
        Ok(self.keys.read().get(key).cloned().unwrap_or_default())
    }

    fn set_field(&self, key: &SubscriptionKey, session: &str, refreshed: Timestamp) -> Result<()> {
        self.round_trip()?;
        self.keys
            .write()
            .entry(key.clone())
            .or_default()
            .insert(session.to_string(), refreshed);
        Ok(())
    }

    fn delete_field(&self, key: &SubscriptionKey, session: &str) -> Result<()> {
        self.round_trip()?;
        let mut keys = self.keys.write();
        if let Some(fields) = keys.get_mut(key) {
            fields.remove(session);
            if fields.is_empty() {
                keys.remove(key);
            }
        }
        Ok(())
    }

    fn delete_key(&self, key: &SubscriptionKey) -> Result<()> {
        self.round_trip()?;
        self.keys.write().remove(key);
        Ok(())
    }

    fn execute(&self, batch: &StoreBatch) -> Result<()> {
        self.round_trip()?;
        let mut keys = self.keys.write();
        for op in batch.iter() {
            keys.entry(op.key.clone())
                .or_default()
                .insert(op.session.clone(), op.refreshed);
        }
        Ok(())
    }
}
