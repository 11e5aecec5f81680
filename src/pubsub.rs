//! Fan-out coordinator tying the registrar and publisher together.

use crate::clock::{Clock, SystemClock};
use crate::config::PubSubConfig;
use crate::error::Result;
use crate::publish::{Publisher, Transport};
use crate::subscriptions::{Registrar, SessionProvider, SubscriptionStore};
use crate::types::{DeliveryReport, RecordRef, Related};
use std::sync::Arc;

/// Change-notification service.
///
/// Each `pub_sub_*` entry point first subscribes the current session to
/// whatever it just read, then publishes to everyone subscribed. A viewer
/// who reads and writes in the same request is therefore registered before
/// the message its write caused is fanned out, and receives it too.
///
/// The plain `pub_sub_*` forms never fail: store or transport errors are
/// logged and the triggering write carries on. The `try_pub_sub_*` forms
/// return them.
pub struct PubSub {
    registrar: Registrar,
    publisher: Publisher,
    session: Arc<dyn SessionProvider>,
    config: PubSubConfig,
}

impl PubSub {
    /// Service with the default configuration and wall-clock time.
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        let config = PubSubConfig::default();
        Self::assemble(store, transport, session, Arc::new(SystemClock), config)
    }

    /// Service with explicit configuration and clock.
    pub fn with_config(
        store: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionProvider>,
        clock: Arc<dyn Clock>,
        config: PubSubConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(store, transport, session, clock, config))
    }

    fn assemble(
        store: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn Transport>,
        session: Arc<dyn SessionProvider>,
        clock: Arc<dyn Clock>,
        config: PubSubConfig,
    ) -> Self {
        let registrar = Registrar::new(Arc::clone(&store), Arc::clone(&clock), &config.key_prefix);
        let publisher = Publisher::new(store, transport, clock, config.clone());
        Self {
            registrar,
            publisher,
            session,
            config,
        }
    }

    pub fn config(&self) -> &PubSubConfig {
        &self.config
    }

    /// Registrar, for subscribing a session other than the current one.
    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn current_session(&self) -> Option<String> {
        self.session.current_session()
    }

    // --- Subscribing (current session) ---

    pub fn subscribe_record(&self, record: &RecordRef) -> Result<()> {
        let session = self.current_session();
        self.registrar.subscribe_record(record, session.as_deref())
    }

    pub fn subscribe_relation(
        &self,
        related: Related<'_>,
        base: Option<&RecordRef>,
        relation: Option<&str>,
    ) -> Result<()> {
        let session = self.current_session();
        self.registrar
            .subscribe_relation(related, session.as_deref(), base, relation)
    }

    pub fn subscribe_scope(
        &self,
        collection: &[RecordRef],
        kind: Option<&str>,
        scope: Option<&str>,
    ) -> Result<()> {
        let session = self.current_session();
        self.registrar
            .subscribe_scope(collection, session.as_deref(), kind, scope)
    }

    // --- Publishing ---

    pub fn publish_record(&self, record: &RecordRef) -> Result<DeliveryReport> {
        self.publisher.publish_record(record)
    }

    pub fn publish_relation(
        &self,
        base: &RecordRef,
        relation: &str,
        cause: Option<&RecordRef>,
    ) -> Result<DeliveryReport> {
        self.publisher.publish_relation(base, relation, cause)
    }

    pub fn publish_scope(&self, kind: &str, scope: &str) -> Result<DeliveryReport> {
        self.publisher.publish_scope(kind, scope)
    }

    // --- Subscribe, then publish ---

    pub fn try_pub_sub_record(&self, record: &RecordRef) -> Result<DeliveryReport> {
        self.subscribe_record(record)?;
        self.publish_record(record)
    }

    pub fn try_pub_sub_relation(
        &self,
        related: Related<'_>,
        base: &RecordRef,
        relation: &str,
        cause: Option<&RecordRef>,
    ) -> Result<DeliveryReport> {
        self.subscribe_relation(related, Some(base), Some(relation))?;
        self.publish_relation(base, relation, cause)
    }

    pub fn try_pub_sub_scope(
        &self,
        collection: &[RecordRef],
        kind: &str,
        scope: &str,
    ) -> Result<DeliveryReport> {
        self.subscribe_scope(collection, Some(kind), Some(scope))?;
        self.publish_scope(kind, scope)
    }

    pub fn pub_sub_record(&self, record: &RecordRef) -> Option<DeliveryReport> {
        match self.try_pub_sub_record(record) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(
                    kind = %record.kind,
                    id = %record.id,
                    error = %e,
                    "record change notification skipped"
                );
                None
            }
        }
    }

    pub fn pub_sub_relation(
        &self,
        related: Related<'_>,
        base: &RecordRef,
        relation: &str,
        cause: Option<&RecordRef>,
    ) -> Option<DeliveryReport> {
        match self.try_pub_sub_relation(related, base, relation, cause) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(
                    kind = %base.kind,
                    id = %base.id,
                    relation,
                    error = %e,
                    "relation change notification skipped"
                );
                None
            }
        }
    }

    pub fn pub_sub_scope(
        &self,
        collection: &[RecordRef],
        kind: &str,
        scope: &str,
    ) -> Option<DeliveryReport> {
        match self.try_pub_sub_scope(collection, kind, scope) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(kind, scope, error = %e, "scope change notification skipped");
                None
            }
        }
    }
}
