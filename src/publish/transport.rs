//! Delivery transports.

use crate::error::{PubSubError, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Channel-addressed push transport (Pusher-like).
pub trait Transport: Send + Sync {
    /// Deliver `payload` as `event` on every channel in `channels`.
    fn trigger(&self, channels: &[String], event: &str, payload: &serde_json::Value) -> Result<()>;

    /// Inactive transports are skipped by the publisher entirely.
    fn is_active(&self) -> bool {
        true
    }
}

/// Transport that delivers nothing. The default when no push backend is
/// configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn trigger(&self, _channels: &[String], _event: &str, _payload: &serde_json::Value) -> Result<()> {
        Ok(())
    }

    fn is_active(&self) -> bool {
        false
    }
}

/// Default buffered deliveries per local channel.
const DEFAULT_CHANNEL_BUFFER: usize = 1000;

/// One message as received on a channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub channel: String,
    pub event: String,
    pub payload: serde_json::Value,
}

/// Receiving end of a [`LocalTransport`] channel.
pub struct ChannelReceiver {
    pub channel: String,
    receiver: Receiver<Delivery>,
}

impl ChannelReceiver {
    /// Receive the next delivery (blocking).
    pub fn recv(&self) -> std::result::Result<Delivery, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a delivery (non-blocking).
    pub fn try_recv(&self) -> std::result::Result<Delivery, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<Delivery, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything buffered right now.
    pub fn drain(&self) -> Vec<Delivery> {
        self.receiver.try_iter().collect()
    }
}

/// In-process transport over bounded channels.
///
/// Channels nobody has opened are silently skipped, as with a push service
/// that has no listener. A receiver that falls behind or is dropped is
/// disconnected.
pub struct LocalTransport {
    senders: RwLock<HashMap<String, Sender<Delivery>>>,
    /// Channel count of every `trigger` call, in order.
    calls: Mutex<Vec<usize>>,
    /// When set, every trigger fails with `TransportUnavailable`.
    unavailable: AtomicBool,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Start listening on `channel`. Reopening replaces the previous receiver.
    pub fn open(&self, channel: impl Into<String>) -> ChannelReceiver {
        self.open_with_buffer(channel, DEFAULT_CHANNEL_BUFFER)
    }

    pub fn open_with_buffer(&self, channel: impl Into<String>, buffer: usize) -> ChannelReceiver {
        let channel = channel.into();
        let (sender, receiver) = bounded(buffer);
        self.senders.write().insert(channel.clone(), sender);
        ChannelReceiver { channel, receiver }
    }

    pub fn close(&self, channel: &str) {
        self.senders.write().remove(channel);
    }

    /// Number of channels with a connected receiver.
    pub fn channel_count(&self) -> usize {
        self.senders.read().len()
    }

    /// Channel count of each `trigger` call made so far.
    pub fn call_sizes(&self) -> Vec<usize> {
        self.calls.lock().clone()
    }

    /// Simulate an outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl Default for LocalTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LocalTransport {
    fn trigger(&self, channels: &[String], event: &str, payload: &serde_json::Value) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PubSubError::TransportUnavailable(
                "local transport marked unavailable".to_string(),
            ));
        }
        self.calls.lock().push(channels.len());

        let mut to_remove = Vec::new();
        {
            let senders = self.senders.read();
            for channel in channels {
                let Some(sender) = senders.get(channel) else {
                    continue;
                };
                let delivery = Delivery {
                    channel: channel.clone(),
                    event: event.to_string(),
                    payload: payload.clone(),
                };
                match sender.try_send(delivery) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                        to_remove.push(channel.clone());
                    }
                }
            }
        }

        if !to_remove.is_empty() {
            let mut senders = self.senders.write();
            for channel in to_remove {
                tracing::warn!(channel = %channel, "dropping unresponsive local channel");
                senders.remove(&channel);
            }
        }

        Ok(())
    }
}
