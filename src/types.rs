//! Core types shared by the registrar, publisher and coordinator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds since Unix epoch, with sub-second precision.
#[derive(Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub f64);

impl Timestamp {
    /// Current wall-clock time.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Timestamp(secs)
    }

    /// This timestamp moved back by `window`.
    pub fn minus(self, window: Duration) -> Self {
        Timestamp(self.0 - window.as_secs_f64())
    }

    /// This timestamp moved forward by `delta`.
    pub fn plus(self, delta: Duration) -> Self {
        Timestamp(self.0 + delta.as_secs_f64())
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Descriptor of a persisted record, as seen by the notification layer.
///
/// ORM adapters translate their model callbacks into one of these; nothing
/// here depends on the model type itself.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordRef {
    /// Model class name (e.g. `"Post"`).
    pub kind: String,

    /// Primary key, in string form.
    pub id: String,

    /// Last modification time, if the model tracks one.
    pub updated_at: Option<Timestamp>,

    /// Whether the record has been destroyed.
    pub destroyed: bool,
}

impl RecordRef {
    pub fn new(kind: impl Into<String>, id: impl ToString) -> Self {
        Self {
            kind: kind.into(),
            id: id.to_string(),
            updated_at: None,
            destroyed: false,
        }
    }

    /// Set the modification time.
    pub fn with_updated_at(mut self, updated_at: Timestamp) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Mark the record as destroyed.
    pub fn with_destroyed(mut self, destroyed: bool) -> Self {
        self.destroyed = destroyed;
        self
    }
}

/// Value of an association on a base record.
#[derive(Clone, Copy, Debug)]
pub enum Related<'a> {
    /// To-many association (has_many and friends).
    Many(&'a [RecordRef]),
    /// To-one association.
    One(&'a RecordRef),
    /// Unset to-one association.
    Empty,
}

impl<'a> Related<'a> {
    /// Every record reachable through this value.
    pub fn records(&self) -> &'a [RecordRef] {
        match *self {
            Related::Many(records) => records,
            Related::One(record) => std::slice::from_ref(record),
            Related::Empty => &[],
        }
    }
}

impl<'a> From<&'a [RecordRef]> for Related<'a> {
    fn from(records: &'a [RecordRef]) -> Self {
        Related::Many(records)
    }
}

impl<'a> From<&'a Vec<RecordRef>> for Related<'a> {
    fn from(records: &'a Vec<RecordRef>) -> Self {
        Related::Many(records.as_slice())
    }
}

impl<'a> From<&'a RecordRef> for Related<'a> {
    fn from(record: &'a RecordRef) -> Self {
        Related::One(record)
    }
}

impl<'a> From<Option<&'a RecordRef>> for Related<'a> {
    fn from(record: Option<&'a RecordRef>) -> Self {
        record.map_or(Related::Empty, Related::One)
    }
}

/// Store key under which the subscribers of one record, relation or scope
/// are kept.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionKey(String);

impl SubscriptionKey {
    /// `{prefix}__{kind}__{id}`
    pub fn record(prefix: &str, kind: &str, id: &str) -> Self {
        SubscriptionKey(format!("{}__{}__{}", prefix, kind, id))
    }

    /// `{prefix}__{kind}__{id}__{relation}`
    pub fn relation(prefix: &str, kind: &str, id: &str, relation: &str) -> Self {
        SubscriptionKey(format!("{}__{}__{}__{}", prefix, kind, id, relation))
    }

    /// `{prefix}__{kind}__scope__{scope}`
    pub fn scope(prefix: &str, kind: &str, scope: &str) -> Self {
        SubscriptionKey(format!("{}__{}__scope__{}", prefix, kind, scope))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionKey({})", self.0)
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SubscriptionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Outcome of one publish.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliveryReport {
    /// Key the subscriber set was read from.
    pub key: SubscriptionKey,
    /// Sessions the message was addressed to.
    pub recipients: usize,
    /// Stale entries removed from the key.
    pub pruned: usize,
    /// Number of transport calls made.
    pub transport_calls: usize,
    /// Whether the key itself was removed afterwards.
    pub key_deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        assert_eq!(
            SubscriptionKey::record("HRPS", "Post", "42").as_str(),
            "HRPS__Post__42"
        );
        assert_eq!(
            SubscriptionKey::relation("HRPS", "Post", "42", "comments").as_str(),
            "HRPS__Post__42__comments"
        );
        assert_eq!(
            SubscriptionKey::scope("HRPS", "Post", "published").as_str(),
            "HRPS__Post__scope__published"
        );
    }

    #[test]
    fn test_related_records() {
        let post = RecordRef::new("Post", 1);
        let comments = vec![RecordRef::new("Comment", 1), RecordRef::new("Comment", 2)];

        assert_eq!(Related::from(&comments).records().len(), 2);
        assert_eq!(Related::from(&post).records(), std::slice::from_ref(&post));
        assert!(Related::from(None).records().is_empty());
    }

    #[test]
    fn test_timestamp_window_arithmetic() {
        let t = Timestamp(1000.0);
        assert_eq!(t.minus(Duration::from_secs(400)), Timestamp(600.0));
        assert_eq!(t.plus(Duration::from_millis(500)), Timestamp(1000.5));
    }

    #[test]
    fn test_record_ref_builder() {
        let record = RecordRef::new("Post", 42)
            .with_updated_at(Timestamp(12.5))
            .with_destroyed(true);

        assert_eq!(record.id, "42");
        assert_eq!(record.updated_at, Some(Timestamp(12.5)));
        assert!(record.destroyed);
    }
}
