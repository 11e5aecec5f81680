//! Fan-out configuration.

use crate::error::{PubSubError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default freshness window (24 hours).
pub const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Channels per transport call. Pusher rejects triggers addressed to more.
pub const DEFAULT_MAX_CHANNELS_PER_TRIGGER: usize = 50;

/// Prefix of every subscription key in the store.
pub const DEFAULT_KEY_PREFIX: &str = "HRPS";

/// Prefix of every per-session delivery channel.
pub const DEFAULT_CHANNEL_PREFIX: &str = "hyper-record-update-channel";

/// Event name attached to every delivery.
pub const DEFAULT_EVENT_NAME: &str = "update";

/// Configuration for a [`PubSub`](crate::PubSub) service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubSubConfig {
    /// Subscribers not refreshed within this window are pruned on publish.
    /// Serialized as whole seconds.
    #[serde(with = "duration_secs", rename = "freshness_window_secs")]
    pub freshness_window: Duration,

    /// Max channels addressed by a single transport call.
    pub max_channels_per_trigger: usize,

    /// Store key prefix.
    pub key_prefix: String,

    /// Channel name prefix; the session id is appended after a dash.
    pub channel_prefix: String,

    /// Transport event name.
    pub event_name: String,
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            freshness_window: Duration::from_secs(DEFAULT_FRESHNESS_WINDOW_SECS),
            max_channels_per_trigger: DEFAULT_MAX_CHANNELS_PER_TRIGGER,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            channel_prefix: DEFAULT_CHANNEL_PREFIX.to_string(),
            event_name: DEFAULT_EVENT_NAME.to_string(),
        }
    }
}

impl PubSubConfig {
    /// Load from a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    pub fn with_max_channels_per_trigger(mut self, max: usize) -> Self {
        self.max_channels_per_trigger = max;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_channel_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.channel_prefix = prefix.into();
        self
    }

    pub fn with_event_name(mut self, name: impl Into<String>) -> Self {
        self.event_name = name.into();
        self
    }

    /// Reject settings the publisher cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_channels_per_trigger == 0 {
            return Err(PubSubError::InvalidConfig(
                "max_channels_per_trigger must be at least 1".to_string(),
            ));
        }
        if self.key_prefix.is_empty() {
            return Err(PubSubError::InvalidConfig(
                "key_prefix must not be empty".to_string(),
            ));
        }
        if self.channel_prefix.is_empty() {
            return Err(PubSubError::InvalidConfig(
                "channel_prefix must not be empty".to_string(),
            ));
        }
        if self.event_name.is_empty() {
            return Err(PubSubError::InvalidConfig(
                "event_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Delivery channel for a session.
    pub fn channel_for(&self, session: &str) -> String {
        format!("{}-{}", self.channel_prefix, session)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
