//! Contracts for the outside world the store depends on.
//!
//! - [`ChildLoader`]: asynchronously produces the children of a node
//! - [`IdGenerator`]: mints ids for nodes created by the store

mod ids;
mod loader;

pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use loader::{ChildLoader, FnLoader, MapLoader, SyntheticLoader, DEFAULT_SYNTHETIC_LATENCY};
