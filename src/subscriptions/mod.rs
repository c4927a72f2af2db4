//! Subscription system for live tree updates.
//!
//! Every mutation that produces a new snapshot is broadcast to subscribers
//! together with a [`Change`] describing it. Subscriptions support:
//! - Filtering by change category (structure, expansion, loading)
//! - An initial snapshot so observers start from a consistent state
//! - Bounded buffers with slow-subscriber dropping
//!
//! # Example
//!
//! ```ignore
//! let handle = store.subscribe(SubscriptionConfig::default())?;
//!
//! loop {
//!     match handle.recv() {
//!         Ok(TreeEvent::Snapshot { snapshot }) => render(&snapshot),
//!         Ok(TreeEvent::Changed { snapshot, .. }) => render(&snapshot),
//!         Ok(TreeEvent::Dropped { .. }) | Err(_) => break,
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    Change, ChangeFilter, DropReason, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
    TreeEvent,
};
