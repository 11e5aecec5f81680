//! Publishing: scrub stale subscribers, then fan out to the rest.

use crate::clock::Clock;
use crate::config::PubSubConfig;
use crate::error::Result;
use crate::subscriptions::SubscriptionStore;
use crate::types::{DeliveryReport, RecordRef, SubscriptionKey, Timestamp};
use std::collections::HashMap;
use std::sync::Arc;

use super::message::ChangeMessage;
use super::transport::Transport;

/// Split subscribers into (live, stale) session ids, each sorted.
///
/// An entry is stale when it was last refreshed strictly before `threshold`.
pub fn partition_subscribers(
    subscribers: HashMap<String, Timestamp>,
    threshold: Timestamp,
) -> (Vec<String>, Vec<String>) {
    let (mut live, mut stale): (Vec<_>, Vec<_>) = subscribers
        .into_iter()
        .partition(|(_, refreshed)| *refreshed >= threshold);

    live.sort_by(|a, b| a.0.cmp(&b.0));
    stale.sort_by(|a, b| a.0.cmp(&b.0));

    (
        live.into_iter().map(|(session, _)| session).collect(),
        stale.into_iter().map(|(session, _)| session).collect(),
    )
}

/// Sends change messages to every live subscriber of a key.
pub struct Publisher {
    store: Arc<dyn SubscriptionStore>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    config: PubSubConfig,
}

impl Publisher {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
        config: PubSubConfig,
    ) -> Self {
        Self {
            store,
            transport,
            clock,
            config,
        }
    }

    /// Notify subscribers of `record`. A destroyed record's key is removed
    /// once delivery is done.
    pub fn publish_record(&self, record: &RecordRef) -> Result<DeliveryReport> {
        let key = SubscriptionKey::record(&self.config.key_prefix, &record.kind, &record.id);
        self.fan_out(key, &ChangeMessage::record(record), record.destroyed)
    }

    /// Notify subscribers of `base`'s `relation`. The key survives any
    /// destroy; relation subscriptions outlive single members.
    pub fn publish_relation(
        &self,
        base: &RecordRef,
        relation: &str,
        cause: Option<&RecordRef>,
    ) -> Result<DeliveryReport> {
        let key =
            SubscriptionKey::relation(&self.config.key_prefix, &base.kind, &base.id, relation);
        self.fan_out(key, &ChangeMessage::relation(base, relation, cause), false)
    }

    /// Notify subscribers of `kind`'s `scope`.
    pub fn publish_scope(&self, kind: &str, scope: &str) -> Result<DeliveryReport> {
        let key = SubscriptionKey::scope(&self.config.key_prefix, kind, scope);
        self.fan_out(key, &ChangeMessage::scope(kind, scope), false)
    }

    fn fan_out(
        &self,
        key: SubscriptionKey,
        message: &ChangeMessage,
        delete_after: bool,
    ) -> Result<DeliveryReport> {
        let subscribers = self.store.get_all(&key)?;
        let threshold = self.clock.now().minus(self.config.freshness_window);
        let (live, stale) = partition_subscribers(subscribers, threshold);

        for session in &stale {
            self.store.delete_field(&key, session)?;
            tracing::trace!(key = %key, session = %session, "pruned stale subscriber");
        }

        let transport_calls = if self.transport.is_active() && !live.is_empty() {
            self.deliver(&live, message)?
        } else {
            0
        };

        if delete_after {
            self.store.delete_key(&key)?;
        }

        tracing::debug!(
            key = %key,
            recipients = live.len(),
            pruned = stale.len(),
            transport_calls,
            "published change"
        );

        Ok(DeliveryReport {
            key,
            recipients: live.len(),
            pruned: stale.len(),
            transport_calls,
            key_deleted: delete_after,
        })
    }

    fn deliver(&self, sessions: &[String], message: &ChangeMessage) -> Result<usize> {
        let payload = serde_json::to_value(message)?;
        let channels: Vec<String> = sessions
            .iter()
            .map(|session| self.config.channel_for(session))
            .collect();

        let mut calls = 0;
        for chunk in channels.chunks(self.config.max_channels_per_trigger.max(1)) {
            self.transport
                .trigger(chunk, &self.config.event_name, &payload)?;
            calls += 1;
        }
        Ok(calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::publish::{LocalTransport, NullTransport};
    use crate::subscriptions::MemoryStore;
    use std::time::Duration;

    const DAY: u64 = 24 * 60 * 60;

    struct Fixture {
        store: Arc<MemoryStore>,
        transport: Arc<LocalTransport>,
        clock: Arc<ManualClock>,
        publisher: Publisher,
    }

    fn fixture(config: PubSubConfig) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(LocalTransport::new());
        let clock = Arc::new(ManualClock::new(Timestamp(0.0)));
        let publisher = Publisher::new(store.clone(), transport.clone(), clock.clone(), config);
        Fixture {
            store,
            transport,
            clock,
            publisher,
        }
    }

    #[test]
    fn test_partition_boundary_is_live() {
        let mut subscribers = HashMap::new();
        subscribers.insert("old".to_string(), Timestamp(9.0));
        subscribers.insert("edge".to_string(), Timestamp(10.0));
        subscribers.insert("new".to_string(), Timestamp(11.0));

        let (live, stale) = partition_subscribers(subscribers, Timestamp(10.0));
        assert_eq!(live, vec!["edge", "new"]);
        assert_eq!(stale, vec!["old"]);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let f = fixture(PubSubConfig::default());
        let report = f.publisher.publish_record(&RecordRef::new("Post", 1)).unwrap();

        assert_eq!(report.recipients, 0);
        assert_eq!(report.transport_calls, 0);
        assert!(f.transport.call_sizes().is_empty());
    }

    #[test]
    fn test_stale_subscriber_pruned() {
        let f = fixture(PubSubConfig::default());
        let post = RecordRef::new("Post", 42);
        let key = SubscriptionKey::record("HRPS", "Post", "42");
        f.store.set_field(&key, "old", Timestamp(0.0)).unwrap();

        f.clock.advance(Duration::from_secs(DAY / 2));
        f.store.set_field(&key, "fresh", f.clock.now()).unwrap();
        f.clock.advance(Duration::from_secs(DAY));

        let rx = f.transport.open("hyper-record-update-channel-fresh");
        let report = f.publisher.publish_record(&post).unwrap();

        assert_eq!(report.recipients, 1);
        assert_eq!(report.pruned, 1);
        let fields = f.store.get_all(&key).unwrap();
        assert!(!fields.contains_key("old"));
        assert!(fields.contains_key("fresh"));
        assert_eq!(rx.drain().len(), 1);
    }

    #[test]
    fn test_batches_channels() {
        let f = fixture(PubSubConfig::default().with_max_channels_per_trigger(50));
        let key = SubscriptionKey::scope("HRPS", "Post", "all");
        for i in 0..120 {
            f.store.set_field(&key, &format!("s{}", i), Timestamp(0.0)).unwrap();
        }

        let report = f.publisher.publish_scope("Post", "all").unwrap();

        assert_eq!(report.recipients, 120);
        assert_eq!(report.transport_calls, 3);
        assert_eq!(f.transport.call_sizes(), vec![50, 50, 20]);
    }

    #[test]
    fn test_destroyed_record_deletes_key() {
        let f = fixture(PubSubConfig::default());
        let key = SubscriptionKey::record("HRPS", "Post", "42");
        f.store.set_field(&key, "s1", Timestamp(0.0)).unwrap();
        let rx = f.transport.open("hyper-record-update-channel-s1");

        let post = RecordRef::new("Post", 42).with_destroyed(true);
        let report = f.publisher.publish_record(&post).unwrap();

        assert!(report.key_deleted);
        assert!(!f.store.contains_key(&key));
        let delivery = rx.try_recv().unwrap();
        assert_eq!(delivery.payload["destroyed"], true);
    }

    #[test]
    fn test_destroyed_cause_keeps_relation_key() {
        let f = fixture(PubSubConfig::default());
        let post = RecordRef::new("Post", 42);
        let key = SubscriptionKey::relation("HRPS", "Post", "42", "comments");
        f.store.set_field(&key, "s1", Timestamp(0.0)).unwrap();

        let comment = RecordRef::new("Comment", 3).with_destroyed(true);
        let report = f
            .publisher
            .publish_relation(&post, "comments", Some(&comment))
            .unwrap();

        assert!(!report.key_deleted);
        assert!(f.store.contains_key(&key));
    }

    #[test]
    fn test_inactive_transport_still_scrubs() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Timestamp(0.0)));
        let publisher = Publisher::new(
            store.clone(),
            Arc::new(NullTransport),
            clock.clone(),
            PubSubConfig::default(),
        );
        let key = SubscriptionKey::record("HRPS", "Post", "1");
        store.set_field(&key, "s1", Timestamp(0.0)).unwrap();
        store.set_field(&key, "s2", Timestamp(0.0)).unwrap();
        clock.set(Timestamp(DAY as f64));
        store.set_field(&key, "s2", clock.now()).unwrap();
        clock.advance(Duration::from_secs(1));

        let report = publisher.publish_record(&RecordRef::new("Post", 1)).unwrap();

        assert_eq!(report.transport_calls, 0);
        assert_eq!(report.pruned, 1);
        assert_eq!(report.recipients, 1);
    }
}
