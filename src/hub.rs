//! # Notification Hub
//!
//! Fan-out of session state changes to everyone watching a session, keyed by
//! session id (one channel per session).
//!
//! Delivery is best-effort and at-most-once per subscriber per publish: a
//! subscriber whose receiver is gone is silently dropped and pruned. The PC
//! side polls the session record as its source of truth, the push only cuts
//! latency. Publishing never blocks the caller.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::db::models::SessionStatus;

/// State-change event pushed to subscribers of a session's channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    pub session_id: String,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type SubscriberId = u64;

struct Subscriber {
    id: SubscriberId,
    tx: EventSender,
}

/// Subscriber registry, channel-per-session-id.
///
/// Cloning shares the registry. Channels are created on first subscribe and
/// garbage-collected when their last subscriber leaves.
#[derive(Clone, Default)]
pub struct NotificationHub {
    channels: Arc<DashMap<String, Vec<Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tx` on `channel`; the returned id is the handle for
    /// unsubscribing.
    pub fn subscribe(&self, channel: &str, tx: EventSender) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.channels
            .entry(channel.to_string())
            .or_default()
            .push(Subscriber { id, tx });
        id
    }

    pub fn unsubscribe(&self, channel: &str, id: SubscriberId) {
        if let Some(mut subscribers) = self.channels.get_mut(channel) {
            subscribers.retain(|s| s.id != id);
        }
        self.channels.remove_if(channel, |_, subscribers| subscribers.is_empty());
    }

    /// Deliver `event` to every current subscriber of `channel`.
    ///
    /// Dead subscribers are pruned as they are encountered. Returns how many
    /// subscribers received the event.
    pub fn publish(&self, channel: &str, event: &SessionEvent) -> usize {
        let mut delivered = 0;
        if let Some(mut subscribers) = self.channels.get_mut(channel) {
            subscribers.retain(|s| match s.tx.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            });
        }
        self.channels.remove_if(channel, |_, subscribers| subscribers.is_empty());
        delivered
    }

    /// Number of live channels; a channel is live while it has subscribers.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
