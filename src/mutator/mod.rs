//! Structural algorithms over an immutable forest.
//!
//! Every operation takes the current forest and returns a new one. Nodes on
//! the path to the change are copied; everything else is shared with the
//! input, and an operation that changes nothing returns the input itself, so
//! callers can detect changes with [`Forest::ptr_eq`](crate::Forest::ptr_eq).
//!
//! Walks use an explicit stack and nodes are freed iteratively, so
//! arbitrarily deep forests are safe to rewrite and drop. Serialization is
//! bounded by [`MAX_SERIALIZE_DEPTH`](crate::types::MAX_SERIALIZE_DEPTH).

mod operations;
mod path;

pub use operations::{
    ancestors, check_move, contains, find, insert, is_descendant, move_node, remove, update,
    MoveCheck,
};
