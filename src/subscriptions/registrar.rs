//! Records which sessions are watching which keys.

use crate::clock::Clock;
use crate::error::Result;
use crate::types::{RecordRef, Related, SubscriptionKey};
use std::sync::Arc;

use super::store::{StoreBatch, SubscriptionStore};

/// Upserts sessions into record, relation and scope keys.
///
/// Every read a viewer performs is an implicit subscribe; the timestamp
/// written is the refresh time the scrubber later compares against.
pub struct Registrar {
    store: Arc<dyn SubscriptionStore>,
    clock: Arc<dyn Clock>,
    key_prefix: String,
}

impl Registrar {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        clock: Arc<dyn Clock>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn record_key(&self, record: &RecordRef) -> SubscriptionKey {
        SubscriptionKey::record(&self.key_prefix, &record.kind, &record.id)
    }

    pub fn relation_key(&self, base: &RecordRef, relation: &str) -> SubscriptionKey {
        SubscriptionKey::relation(&self.key_prefix, &base.kind, &base.id, relation)
    }

    pub fn scope_key(&self, kind: &str, scope: &str) -> SubscriptionKey {
        SubscriptionKey::scope(&self.key_prefix, kind, scope)
    }

    /// Subscribe `session` to a single record.
    pub fn subscribe_record(&self, record: &RecordRef, session: Option<&str>) -> Result<()> {
        let Some(session) = session else {
            return Ok(());
        };
        self.store
            .set_field(&self.record_key(record), session, self.clock.now())
    }

    /// Subscribe `session` to every record reachable through `related`, and
    /// to the association itself when `base` and `relation` are both given.
    pub fn subscribe_relation(
        &self,
        related: Related<'_>,
        session: Option<&str>,
        base: Option<&RecordRef>,
        relation: Option<&str>,
    ) -> Result<()> {
        let Some(session) = session else {
            return Ok(());
        };

        let now = self.clock.now();
        let mut batch = StoreBatch::new();
        for record in related.records() {
            batch.set_field(self.record_key(record), session, now);
        }
        if let (Some(base), Some(relation)) = (base, relation) {
            batch.set_field(self.relation_key(base, relation), session, now);
        }

        self.submit(batch, session)
    }

    /// Subscribe `session` to every member of a scope's result set, and to
    /// the scope itself when `kind` and `scope` are both given.
    pub fn subscribe_scope(
        &self,
        collection: &[RecordRef],
        session: Option<&str>,
        kind: Option<&str>,
        scope: Option<&str>,
    ) -> Result<()> {
        let Some(session) = session else {
            return Ok(());
        };

        let now = self.clock.now();
        let mut batch = StoreBatch::new();
        for record in collection {
            batch.set_field(self.record_key(record), session, now);
        }
        if let (Some(kind), Some(scope)) = (kind, scope) {
            batch.set_field(self.scope_key(kind, scope), session, now);
        }

        self.submit(batch, session)
    }

    fn submit(&self, batch: StoreBatch, session: &str) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.store.execute(&batch)?;
        tracing::debug!(session, keys = batch.len(), "subscribed session");
        Ok(())
    }
}
