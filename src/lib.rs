//! # Grove
//!
//! An in-memory ordered forest of uniquely identified, named nodes with
//! structural mutations and on-demand loading of subtrees.
//!
//! ## Core Concepts
//!
//! - **Forest**: immutable, structurally shared sequence of root nodes
//! - **Mutator**: pure rewrites (find, update, insert, remove, move)
//! - **Expansion**: expanded and loading id sets, fetch deduplication
//! - **Store**: the single mutable holder, publishing snapshots
//!
//! ## Example
//!
//! ```ignore
//! use grove::{sample_forest, SyntheticLoader, TreeStore};
//!
//! let store = TreeStore::new(sample_forest(), SyntheticLoader::new())?;
//!
//! // Lazily load the children of "Images"
//! store.toggle_node("root-2").await?;
//!
//! // Add, rename, move
//! let id = store.add_node(Some("root-1"), "Notes")?.unwrap();
//! store.rename_node(id.as_str(), "Meeting Notes");
//! store.move_node(id.as_str(), "root-3");
//!
//! let snapshot = store.snapshot();
//! ```

pub mod error;
pub mod expansion;
pub mod fixtures;
pub mod mutator;
pub mod source;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use error::{LoadError, Result, TreeError};
pub use expansion::{ExpansionController, TogglePlan};
pub use fixtures::sample_forest;
pub use mutator::MoveCheck;
pub use source::{
    ChildLoader, FnLoader, IdGenerator, MapLoader, SequentialIds, SyntheticLoader, UuidIds,
};
pub use store::{StoreConfig, ToggleOutcome, TreeSnapshot, TreeStore};
pub use subscriptions::{
    Change, ChangeFilter, DropReason, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
    SubscriptionManager, TreeEvent,
};
pub use types::*;
