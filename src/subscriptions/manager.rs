//! Subscription manager for broadcasting tree changes.

use crate::error::{Result, TreeError};
use crate::store::TreeSnapshot;
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{
    Change, DropReason, SubscriptionConfig, SubscriptionHandle, SubscriptionId, TreeEvent,
};

/// Internal subscription state.
struct Subscription {
    config: SubscriptionConfig,
    sender: Sender<TreeEvent>,
}

impl Subscription {
    /// Try to send an event. Returns false if buffer is full (subscriber will be dropped).
    fn try_send(&self, event: TreeEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(crossbeam_channel::TrySendError::Full(_)) => false,
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Manages subscriptions and broadcasts changes.
pub struct SubscriptionManager {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a new subscription.
    ///
    /// With `send_initial` set, `current` is queued as the first event.
    pub fn subscribe(
        &self,
        config: SubscriptionConfig,
        current: &TreeSnapshot,
    ) -> Result<SubscriptionHandle> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        // A zero-capacity channel would be a rendezvous channel and drop every event.
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        let subscription = Subscription { config, sender };
        if subscription.config.send_initial
            && !subscription.try_send(TreeEvent::Snapshot {
                snapshot: current.clone(),
            })
        {
            return Err(TreeError::SubscriptionDropped);
        }

        self.subscriptions.write().insert(id, subscription);

        Ok(SubscriptionHandle { id, receiver })
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            // Send dropped event (best effort)
            let _ = sub.sender.try_send(TreeEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Broadcast a change and the snapshot it produced to matching subscriptions.
    ///
    /// Subscribers whose buffer is full are dropped.
    pub fn publish(&self, change: &Change, snapshot: &TreeSnapshot) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if !sub.config.filter.matches(change) {
                    continue;
                }
                let event = TreeEvent::Changed {
                    change: change.clone(),
                    snapshot: snapshot.clone(),
                };
                if !sub.try_send(event) {
                    to_remove.push(*id);
                }
            }
        }

        // Remove dropped subscriptions
        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    tracing::warn!(subscription = id.0, "Dropping slow subscriber");
                    // Try to notify about the drop (might fail, that's ok)
                    let _ = sub.sender.try_send(TreeEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
