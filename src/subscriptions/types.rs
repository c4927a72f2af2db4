//! Subscription types for live tree updates.

use crate::store::TreeSnapshot;
use crate::types::NodeId;
use serde::Serialize;

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping subscriber.
    /// Default: 1000
    pub buffer_size: usize,

    /// Send the current snapshot as the first event.
    /// Default: true
    pub send_initial: bool,

    /// Filter criteria.
    pub filter: ChangeFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            send_initial: true,
            filter: ChangeFilter::all(),
        }
    }
}

/// Which categories of change a subscriber wants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangeFilter {
    /// Node creation, removal, renaming, moving and attached children.
    pub structure: bool,

    /// Expanded-set changes.
    pub expansion: bool,

    /// Loading-set changes and fetch outcomes.
    pub loading: bool,
}

impl ChangeFilter {
    /// Structural changes only.
    pub fn structure() -> Self {
        Self {
            structure: true,
            ..Default::default()
        }
    }

    /// Expansion changes only.
    pub fn expansion() -> Self {
        Self {
            expansion: true,
            ..Default::default()
        }
    }

    /// Fetch lifecycle only.
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Default::default()
        }
    }

    /// Subscribe to everything.
    pub fn all() -> Self {
        Self {
            structure: true,
            expansion: true,
            loading: true,
        }
    }

    /// Check if a change falls into any wanted category.
    pub fn matches(&self, change: &Change) -> bool {
        match change {
            Change::NodeAdded {
                expanded_parent, ..
            } => self.structure || (self.expansion && *expanded_parent),
            Change::NodeRemoved { .. } | Change::NodeRenamed { .. } | Change::NodeMoved { .. } => {
                self.structure
            }
            Change::Expanded { .. } | Change::Collapsed { .. } => self.expansion,
            Change::LoadStarted { .. } => self.expansion || self.loading,
            Change::LoadCompleted { .. } => self.structure || self.loading,
            Change::LoadFailed { .. } | Change::LoadDiscarded { .. } => self.loading,
        }
    }
}

/// A single mutation that produced a new snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Change {
    /// A node was created.
    NodeAdded {
        parent: Option<NodeId>,
        id: NodeId,
        /// The parent was expanded as part of the same change.
        expanded_parent: bool,
    },

    /// A node and its subtree were removed.
    NodeRemoved { id: NodeId },

    /// A node got a new label.
    NodeRenamed { id: NodeId, name: String },

    /// A node was moved before another node.
    NodeMoved { id: NodeId, before: NodeId },

    /// A node was expanded without starting a fetch.
    Expanded { id: NodeId },

    /// A node was collapsed.
    Collapsed { id: NodeId },

    /// A node was expanded and its children are being fetched.
    LoadStarted { id: NodeId },

    /// Fetched children were attached.
    LoadCompleted { id: NodeId, count: usize },

    /// The fetch failed; the node can be retried.
    LoadFailed { id: NodeId, error: String },

    /// The fetch finished but its result was not attached.
    LoadDiscarded { id: NodeId },
}

/// Events emitted by subscriptions.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeEvent {
    /// The snapshot current at subscription time.
    Snapshot { snapshot: TreeSnapshot },

    /// A mutation produced a new snapshot.
    Changed {
        change: Change,
        snapshot: TreeSnapshot,
    },

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to manage a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<TreeEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<TreeEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<TreeEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<TreeEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently buffered.
    pub fn drain(&self) -> Vec<TreeEvent> {
        self.receiver.try_iter().collect()
    }
}
