//! Expansion controller implementation.

use crate::error::{Result, TreeError};
use crate::mutator;
use crate::types::{Forest, NodeId, TreeNode};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// What a toggle decided to do, before any fetch runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TogglePlan {
    /// The node was expanded and is now collapsed.
    Collapse,
    /// The node is now expanded and needs no fetch.
    Expand,
    /// The node is now expanded and the caller must fetch its children.
    Fetch,
    /// The node is now expanded; a fetch started earlier is still in flight.
    AlreadyLoading,
}

/// Owner of the expanded and loading id sets.
///
/// Cloning is cheap: both sets are shared until one side changes them.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExpansionController {
    expanded: Arc<BTreeSet<NodeId>>,
    loading: Arc<BTreeSet<NodeId>>,
}

impl ExpansionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expanded(&self) -> &BTreeSet<NodeId> {
        &self.expanded
    }

    pub fn loading(&self) -> &BTreeSet<NodeId> {
        &self.loading
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.loading.contains(id)
    }

    /// Synchronous half of a toggle.
    ///
    /// Flips expansion of `id`. When expanding a node whose children are
    /// hinted but absent, and no fetch is in flight for it, the node is
    /// marked loading and [`TogglePlan::Fetch`] tells the caller to fetch.
    /// Collapsing never cancels an in-flight fetch.
    pub fn begin_toggle(&mut self, forest: &Forest, id: &str) -> TogglePlan {
        if self.expanded.contains(id) {
            Arc::make_mut(&mut self.expanded).remove(id);
            return TogglePlan::Collapse;
        }
        Arc::make_mut(&mut self.expanded).insert(NodeId::from(id));

        let needs_load = mutator::find(forest, id).is_some_and(|node| node.needs_load());
        if !needs_load {
            return TogglePlan::Expand;
        }
        if self.loading.contains(id) {
            return TogglePlan::AlreadyLoading;
        }

        Arc::make_mut(&mut self.loading).insert(NodeId::from(id));
        TogglePlan::Fetch
    }

    /// Mark `id` expanded. Returns false if it already was.
    pub fn expand(&mut self, id: &str) -> bool {
        if self.expanded.contains(id) {
            return false;
        }
        Arc::make_mut(&mut self.expanded).insert(NodeId::from(id))
    }

    /// Clear the loading mark for `id`. Returns false if it was not set.
    pub fn finish_load(&mut self, id: &str) -> bool {
        if !self.loading.contains(id) {
            return false;
        }
        Arc::make_mut(&mut self.loading).remove(id)
    }
}

/// Attach fetched children to `id`.
///
/// Returns `Ok(None)` when `id` no longer exists (the result is discarded).
/// If the node gained children while the fetch was in flight, the fetched
/// nodes are placed ahead of them. With `validate` set, a fetched id that
/// already exists in the forest or repeats within the batch is rejected and
/// nothing is attached.
pub fn attach_children(
    forest: &Forest,
    id: &str,
    fetched: Vec<TreeNode>,
    validate: bool,
) -> Result<Option<Forest>> {
    if !mutator::contains(forest, id) {
        return Ok(None);
    }

    let batch = Forest::from_nodes(fetched);
    if validate {
        if let Some(duplicate) = batch.duplicate_ids().into_iter().next() {
            return Err(TreeError::DuplicateId(duplicate));
        }
        let existing: HashSet<&NodeId> = forest.ids().collect();
        if let Some(duplicate) = batch.ids().find(|id| existing.contains(id)) {
            return Err(TreeError::DuplicateId(duplicate.clone()));
        }
    }

    let updated = mutator::update(forest, id, |node| {
        let children = match &node.children {
            None => batch,
            Some(existing) => {
                Forest::from_shared(batch.iter().chain(existing.iter()).cloned().collect())
            }
        };
        let mut loaded = node.with_children(children);
        loaded.has_children = node.has_children || loaded.child_count() > 0;
        loaded
    });

    Ok(Some(updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Forest {
        Forest::from_nodes([
            TreeNode::branch("root-1", "Documents", [TreeNode::leaf("child-1-1", "Plans")]),
            TreeNode::lazy("root-2", "Images"),
            TreeNode::leaf("root-3", "System"),
        ])
    }

    #[test]
    fn test_toggle_loaded_node() {
        let forest = sample();
        let mut controller = ExpansionController::new();

        assert_eq!(controller.begin_toggle(&forest, "root-1"), TogglePlan::Expand);
        assert!(controller.is_expanded("root-1"));
        assert!(controller.loading().is_empty());

        assert_eq!(controller.begin_toggle(&forest, "root-1"), TogglePlan::Collapse);
        assert!(!controller.is_expanded("root-1"));
    }

    #[test]
    fn test_toggle_lazy_node_marks_loading_once() {
        let forest = sample();
        let mut controller = ExpansionController::new();

        assert_eq!(controller.begin_toggle(&forest, "root-2"), TogglePlan::Fetch);
        assert!(controller.is_loading("root-2"));

        assert_eq!(controller.begin_toggle(&forest, "root-2"), TogglePlan::Collapse);
        assert!(controller.is_loading("root-2"));

        assert_eq!(controller.begin_toggle(&forest, "root-2"), TogglePlan::AlreadyLoading);
        assert_eq!(controller.loading().len(), 1);

        assert!(controller.finish_load("root-2"));
        assert!(!controller.finish_load("root-2"));
    }

    #[test]
    fn test_toggle_unknown_node_only_expands() {
        let forest = sample();
        let mut controller = ExpansionController::new();
        assert_eq!(controller.begin_toggle(&forest, "ghost"), TogglePlan::Expand);
        assert!(controller.is_expanded("ghost"));
    }

    #[test]
    fn test_clone_is_independent() {
        let forest = sample();
        let mut controller = ExpansionController::new();
        controller.expand("root-1");
        let before = controller.clone();
        controller.begin_toggle(&forest, "root-2");
        assert!(!before.is_expanded("root-2"));
        assert!(controller.is_expanded("root-2"));
    }

    #[test]
    fn test_attach_children() {
        let forest = sample();
        let fetched = vec![TreeNode::leaf("a", "A"), TreeNode::lazy("b", "B")];
        let updated = attach_children(&forest, "root-2", fetched, true)
            .unwrap()
            .unwrap();

        let node = mutator::find(&updated, "root-2").unwrap();
        assert!(node.has_children);
        assert_eq!(node.child_count(), 2);
        assert!(Arc::ptr_eq(&forest[0], &updated[0]));
    }

    #[test]
    fn test_attach_children_to_removed_node() {
        let forest = sample();
        let result = attach_children(&forest, "ghost", vec![TreeNode::leaf("a", "A")], true);
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_attach_children_rejects_duplicates() {
        let forest = sample();
        let clash = vec![TreeNode::leaf("child-1-1", "Clash")];
        assert!(matches!(
            attach_children(&forest, "root-2", clash, true),
            Err(TreeError::DuplicateId(id)) if id == "child-1-1"
        ));

        let repeated = vec![TreeNode::leaf("a", "A"), TreeNode::leaf("a", "A again")];
        assert!(matches!(
            attach_children(&forest, "root-2", repeated, true),
            Err(TreeError::DuplicateId(_))
        ));

        let clash = vec![TreeNode::leaf("child-1-1", "Clash")];
        assert!(attach_children(&forest, "root-2", clash, false).is_ok());
    }

    #[test]
    fn test_attach_keeps_children_added_meanwhile() {
        let forest = mutator::insert(&sample(), Some("root-2"), TreeNode::leaf("added", "Added"));
        let updated = attach_children(&forest, "root-2", vec![TreeNode::leaf("a", "A")], true)
            .unwrap()
            .unwrap();
        let children = mutator::find(&updated, "root-2")
            .unwrap()
            .children
            .clone()
            .unwrap();
        let ids: Vec<_> = children.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "added"]);
    }
}
