//! Failure behaviour of the fan-out coordinator.

use record_pubsub::{
    FixedSession, LocalTransport, ManualClock, MemoryStore, NullTransport, PubSub, PubSubConfig,
    PubSubError, RecordRef, SubscriptionKey, SubscriptionStore, Timestamp,
};
use std::sync::Arc;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn service(
    store: Arc<MemoryStore>,
    transport: Arc<LocalTransport>,
) -> PubSub {
    PubSub::with_config(
        store,
        transport,
        Arc::new(FixedSession::new("s1")),
        Arc::new(ManualClock::new(Timestamp(0.0))),
        PubSubConfig::default(),
    )
    .unwrap()
}

// --- Store Errors ---

#[test]
fn test_store_outage_skips_notification() {
    init_logging();
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(LocalTransport::new());
    let pubsub = service(store.clone(), transport.clone());
    let comments = vec![RecordRef::new("Comment", 1)];
    let post = RecordRef::new("Post", 1);

    store.set_unavailable(true);

    assert!(pubsub.pub_sub_record(&post).is_none());
    assert!(pubsub
        .pub_sub_relation((&comments).into(), &post, "comments", None)
        .is_none());
    assert!(pubsub.pub_sub_scope(&comments, "Comment", "all").is_none());
    assert!(transport.call_sizes().is_empty());

    // Recovers once the store is back
    store.set_unavailable(false);
    assert_eq!(pubsub.pub_sub_record(&post).unwrap().recipients, 1);
}

#[test]
fn test_store_outage_propagates_from_try() {
    let store = Arc::new(MemoryStore::new());
    let pubsub = service(store.clone(), Arc::new(LocalTransport::new()));
    store.set_unavailable(true);

    let result = pubsub.try_pub_sub_scope(&[], "Post", "all");
    assert!(matches!(result, Err(PubSubError::StoreUnavailable(_))));
}

// --- Transport Errors ---

#[test]
fn test_transport_outage_keeps_subscription() {
    init_logging();
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(LocalTransport::new());
    let pubsub = service(store.clone(), transport.clone());
    let post = RecordRef::new("Post", 1);

    transport.set_unavailable(true);
    let result = pubsub.try_pub_sub_record(&post);
    assert!(matches!(result, Err(PubSubError::TransportUnavailable(_))));

    // The subscribe half already landed
    let key = SubscriptionKey::record("HRPS", "Post", "1");
    assert!(store.get_all(&key).unwrap().contains_key("s1"));
}

#[test]
fn test_destroyed_key_kept_when_delivery_fails() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(LocalTransport::new());
    let pubsub = service(store.clone(), transport.clone());
    let post = RecordRef::new("Post", 1);
    pubsub.subscribe_record(&post).unwrap();

    transport.set_unavailable(true);
    assert!(pubsub
        .publish_record(&post.clone().with_destroyed(true))
        .is_err());

    assert!(store.contains_key(&SubscriptionKey::record("HRPS", "Post", "1")));
}

// --- Inactive Transport ---

#[test]
fn test_null_transport_is_silent() {
    let store = Arc::new(MemoryStore::new());
    let pubsub = PubSub::new(
        store.clone(),
        Arc::new(NullTransport),
        Arc::new(FixedSession::new("s1")),
    );

    let report = pubsub.pub_sub_record(&RecordRef::new("Post", 1)).unwrap();

    assert_eq!(report.recipients, 1);
    assert_eq!(report.transport_calls, 0);
    assert_eq!(store.len(), 1);
}

// --- Configuration ---

#[test]
fn test_invalid_config_rejected() {
    let result = PubSub::with_config(
        Arc::new(MemoryStore::new()),
        Arc::new(NullTransport),
        Arc::new(FixedSession::none()),
        Arc::new(ManualClock::default()),
        PubSubConfig::default().with_max_channels_per_trigger(0),
    );
    assert!(matches!(result, Err(PubSubError::InvalidConfig(_))));
}
