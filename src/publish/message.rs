//! Change notification payloads.

use crate::types::{RecordRef, Timestamp};
use serde::{Deserialize, Serialize};

/// Message pushed to every live subscriber of a key.
///
/// Optional fields are left out of the JSON entirely when they do not apply:
/// scope messages carry no `id`, only relation messages carry `relation`,
/// and `destroyed` appears only for destroyed records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeMessage {
    pub record_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroyed: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Cause>,
}

/// The record whose change triggered a relation-level message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cause {
    pub record_type: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    pub destroyed: bool,
}

impl From<&RecordRef> for Cause {
    fn from(record: &RecordRef) -> Self {
        Self {
            record_type: record.kind.clone(),
            id: record.id.clone(),
            updated_at: record.updated_at,
            destroyed: record.destroyed,
        }
    }
}

impl ChangeMessage {
    /// A record was saved or destroyed.
    pub fn record(record: &RecordRef) -> Self {
        Self {
            record_type: record.kind.clone(),
            id: Some(record.id.clone()),
            updated_at: record.updated_at,
            relation: None,
            scope: None,
            destroyed: record.destroyed.then_some(true),
            cause: None,
        }
    }

    /// The membership of `base`'s `relation` changed, optionally because of
    /// `cause`.
    pub fn relation(base: &RecordRef, relation: &str, cause: Option<&RecordRef>) -> Self {
        Self {
            relation: Some(relation.to_string()),
            cause: cause.map(Cause::from),
            ..Self::record(base)
        }
    }

    /// The result set of `kind`'s `scope` changed.
    pub fn scope(kind: &str, scope: &str) -> Self {
        Self {
            record_type: kind.to_string(),
            id: None,
            updated_at: None,
            relation: None,
            scope: Some(scope.to_string()),
            destroyed: None,
            cause: None,
        }
    }
}
