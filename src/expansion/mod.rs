//! Expansion state and the lazy-load state machine.
//!
//! The controller owns two id sets:
//! - expanded: which nodes the presentation layer shows open
//! - loading: which nodes have a fetch in flight (used for deduplication)
//!
//! Deciding whether to fetch and marking the node as loading happen in one
//! synchronous step, so two toggles racing on the same node never issue two
//! fetches.

mod controller;

pub use controller::{attach_children, ExpansionController, TogglePlan};
