//! Pure structural rewrites over a forest.

use super::path::{locate, splice};
use crate::types::{Forest, NodeId, TreeNode};
use std::sync::Arc;

/// Find the first node with `id` in depth-first pre-order.
pub fn find<'a>(forest: &'a Forest, id: &str) -> Option<&'a Arc<TreeNode>> {
    forest
        .walk()
        .map(|(_, node)| node)
        .find(|node| node.id.as_str() == id)
}

/// Whether a node with `id` exists anywhere in the forest.
pub fn contains(forest: &Forest, id: &str) -> bool {
    find(forest, id).is_some()
}

/// Whether `id` lies strictly inside the subtree of `ancestor`.
pub fn is_descendant(forest: &Forest, ancestor: &str, id: &str) -> bool {
    find(forest, ancestor).is_some_and(|node| subtree_contains(node, id))
}

/// Ids of the ancestors of `id`, outermost first.
///
/// Returns `None` if `id` is absent.
pub fn ancestors(forest: &Forest, id: &str) -> Option<Vec<NodeId>> {
    let path = locate(forest, id)?;
    let (_, parents) = path.split_last()?;

    let mut ids = Vec::with_capacity(parents.len());
    let mut siblings = forest;
    for &index in parents {
        let node = siblings.get(index)?;
        ids.push(node.id.clone());
        siblings = node.children.as_ref()?;
    }
    Some(ids)
}

/// Replace the node with `id` by `transform(node)`.
///
/// Ancestors of the target are shallow-copied; every other subtree is shared.
/// Returns the input forest itself when `id` is absent.
pub fn update<F>(forest: &Forest, id: &str, transform: F) -> Forest
where
    F: FnOnce(&TreeNode) -> TreeNode,
{
    let Some(path) = locate(forest, id) else {
        return forest.clone();
    };
    let Some((&index, owner)) = path.split_last() else {
        return forest.clone();
    };

    splice(forest, owner, |siblings| {
        let mut nodes = siblings.to_vec();
        nodes[index] = Arc::new(transform(siblings[index].as_ref()));
        nodes
    })
}

/// Append `node` to the children of `parent_id`, or to the top level when
/// `parent_id` is `None`.
///
/// The parent's child sequence is created if absent and its `has_children`
/// becomes true. An unknown parent leaves the forest untouched.
pub fn insert(forest: &Forest, parent_id: Option<&str>, node: TreeNode) -> Forest {
    let owner = match parent_id {
        None => Vec::new(),
        Some(parent_id) => match locate(forest, parent_id) {
            Some(path) => path,
            None => return forest.clone(),
        },
    };

    splice(forest, &owner, |siblings| {
        let mut nodes = siblings.to_vec();
        nodes.push(Arc::new(node));
        nodes
    })
}

/// Remove the node with `id` together with its subtree.
///
/// Returns the input forest itself when `id` is absent.
pub fn remove(forest: &Forest, id: &str) -> Forest {
    let Some(path) = locate(forest, id) else {
        return forest.clone();
    };
    let Some((&index, owner)) = path.split_last() else {
        return forest.clone();
    };

    splice(forest, owner, |siblings| {
        let mut nodes = siblings.to_vec();
        nodes.remove(index);
        nodes
    })
}

/// Outcome of validating a move before any rewrite happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveCheck {
    /// The move can be applied.
    Allowed,
    /// The node to move does not exist.
    SourceMissing,
    /// The node to move before does not exist.
    TargetMissing,
    /// The node would be moved before itself.
    SameNode,
    /// The target lies inside the moved subtree.
    IntoOwnSubtree,
}

/// Validate moving `active_id` before `over_id`.
pub fn check_move(forest: &Forest, active_id: &str, over_id: &str) -> MoveCheck {
    let Some(source) = find(forest, active_id) else {
        return MoveCheck::SourceMissing;
    };
    if active_id == over_id {
        return MoveCheck::SameNode;
    }
    if subtree_contains(source, over_id) {
        return MoveCheck::IntoOwnSubtree;
    }
    if !contains(forest, over_id) {
        return MoveCheck::TargetMissing;
    }
    MoveCheck::Allowed
}

/// Move `active_id` so that it sits immediately before `over_id` in whatever
/// sibling sequence holds `over_id`.
///
/// The moved subtree keeps its identity. Any move that [`check_move`] does not
/// allow returns the input forest itself, so the source is never lost.
pub fn move_node(forest: &Forest, active_id: &str, over_id: &str) -> Forest {
    if check_move(forest, active_id, over_id) != MoveCheck::Allowed {
        return forest.clone();
    }
    let Some(source) = find(forest, active_id).map(Arc::clone) else {
        return forest.clone();
    };

    let detached = remove(forest, active_id);
    let Some(target) = locate(&detached, over_id) else {
        return forest.clone();
    };
    let Some((&index, owner)) = target.split_last() else {
        return forest.clone();
    };

    splice(&detached, owner, |siblings| {
        let mut nodes = siblings.to_vec();
        nodes.insert(index, source);
        nodes
    })
}

fn subtree_contains(node: &TreeNode, id: &str) -> bool {
    node.children
        .as_ref()
        .is_some_and(|children| contains(children, id))
}
