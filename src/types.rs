//! Core types for the forest.

use serde::ser::{Error as SerError, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Globally unique identifier for a node.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Deepest forest that [`Forest::to_json`] and the `Serialize` impls accept.
///
/// Each level nests two JSON values, so anything deeper could not be read
/// back under serde_json's default nesting limit of 128.
pub const MAX_SERIALIZE_DEPTH: usize = 60;

/// A single node in the forest.
///
/// Nodes are never mutated once shared; every rewrite builds a new node and
/// reuses untouched subtrees. Dropping, comparing and formatting work at any
/// depth.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: NodeId,

    /// User-facing label.
    pub name: String,

    /// `None` means "not loaded yet", an empty forest means "loaded, no children".
    #[serde(default)]
    pub children: Option<Forest>,

    /// Hint that a subtree exists, possibly not loaded yet.
    #[serde(default)]
    pub has_children: bool,
}

impl TreeNode {
    /// A node with no subtree.
    pub fn leaf(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children: None,
            has_children: false,
        }
    }

    /// A node whose children will be fetched on first expansion.
    pub fn lazy(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            children: None,
            has_children: true,
        }
    }

    /// A node with an already-loaded subtree.
    pub fn branch(
        id: impl Into<NodeId>,
        name: impl Into<String>,
        children: impl IntoIterator<Item = TreeNode>,
    ) -> Self {
        let children = Forest::from_nodes(children);
        Self {
            id: id.into(),
            name: name.into(),
            has_children: !children.is_empty(),
            children: Some(children),
        }
    }

    /// Copy of this node with a new label.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        let mut node = self.clone();
        node.name = name.into();
        node
    }

    /// Copy of this node with a replaced child sequence.
    pub fn with_children(&self, children: Forest) -> Self {
        let mut node = self.clone();
        node.children = Some(children);
        node
    }

    /// Whether the child sequence is present (possibly empty).
    pub fn is_loaded(&self) -> bool {
        self.children.is_some()
    }

    /// Whether expanding this node should trigger a fetch.
    pub fn needs_load(&self) -> bool {
        self.has_children && self.children.is_none()
    }

    pub fn child_count(&self) -> usize {
        self.children.as_ref().map_or(0, |children| children.len())
    }
}

impl Drop for TreeNode {
    // Unlinks uniquely owned descendants onto a heap stack so a long chain
    // is freed in a loop instead of one stack frame per level.
    fn drop(&mut self) {
        let Some(children) = self.children.take() else {
            return;
        };
        let mut pending = vec![children.0];

        while let Some(shared) = pending.pop() {
            let Ok(nodes) = Arc::try_unwrap(shared) else {
                continue;
            };
            for node in nodes {
                if let Ok(mut node) = Arc::try_unwrap(node) {
                    if let Some(children) = node.children.take() {
                        pending.push(children.0);
                    }
                }
            }
        }
    }
}

impl PartialEq for TreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.has_children == other.has_children
            && self.children == other.children
    }
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("has_children", &self.has_children)
            .field("children", &self.children)
            .finish()
    }
}

impl Serialize for TreeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let depth = 1 + self.children.as_ref().map_or(0, Forest::depth);
        check_depth::<S>(depth)?;
        NodeFields(self).serialize(serializer)
    }
}

/// Ordered sequence of sibling nodes.
///
/// Cloning is cheap: the sequence and every node in it are shared. Two forests
/// compare equal structurally; use [`Forest::ptr_eq`] for identity.
#[derive(Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Forest(Arc<Vec<Arc<TreeNode>>>);

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = TreeNode>) -> Self {
        Forest(Arc::new(nodes.into_iter().map(Arc::new).collect()))
    }

    pub fn from_shared(nodes: Vec<Arc<TreeNode>>) -> Self {
        Forest(Arc::new(nodes))
    }

    /// Whether both forests are the same allocation.
    pub fn ptr_eq(&self, other: &Forest) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Pre-order traversal yielding `(depth, node)`.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(0, self.0.iter())],
        }
    }

    /// Number of levels; zero for an empty forest.
    pub fn depth(&self) -> usize {
        self.walk().map(|(depth, _)| depth + 1).max().unwrap_or(0)
    }

    /// Total number of nodes at every depth.
    pub fn node_count(&self) -> usize {
        self.walk().count()
    }

    /// Every id in pre-order.
    pub fn ids(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.walk().map(|(_, node)| &node.id)
    }

    /// Ids that appear more than once, in order of their second occurrence.
    pub fn duplicate_ids(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.ids()
            .filter(|id| !seen.insert(*id))
            .cloned()
            .collect()
    }

    /// Parse a forest from its JSON form (the data-source wire shape).
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(|e| crate::TreeError::Deserialization(e.to_string()))
    }

    /// Fails for forests deeper than [`MAX_SERIALIZE_DEPTH`].
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Deref for Forest {
    type Target = [Arc<TreeNode>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for Forest {
    fn eq(&self, other: &Self) -> bool {
        // Pre-order with depths determines the shape, so comparing the two
        // walks entry by entry compares the whole structure.
        fn entry<'a>(
            (depth, node): (usize, &'a Arc<TreeNode>),
        ) -> (usize, &'a NodeId, &'a str, bool, bool) {
            (
                depth,
                &node.id,
                node.name.as_str(),
                node.has_children,
                node.is_loaded(),
            )
        }

        self.ptr_eq(other) || self.walk().map(entry).eq(other.walk().map(entry))
    }
}

impl fmt::Debug for Forest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.walk().map(|(depth, node)| Outline {
                depth,
                node: node.as_ref(),
            }))
            .finish()
    }
}

/// One `depth:id "name"` line of a forest's debug outline.
struct Outline<'a> {
    depth: usize,
    node: &'a TreeNode,
}

impl fmt::Debug for Outline<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {:?}", self.depth, self.node.id, self.node.name)?;
        if self.node.needs_load() {
            write!(f, " (unloaded)")?;
        }
        Ok(())
    }
}

impl Serialize for Forest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        check_depth::<S>(self.depth())?;
        Siblings(self).serialize(serializer)
    }
}

fn check_depth<S: Serializer>(depth: usize) -> Result<(), S::Error> {
    if depth > MAX_SERIALIZE_DEPTH {
        return Err(<S::Error as SerError>::custom(format!(
            "forest depth {} exceeds the serializable limit of {}",
            depth, MAX_SERIALIZE_DEPTH
        )));
    }
    Ok(())
}

// Serialization below runs only after the depth check, so the recursion
// through these wrappers is bounded.

struct Siblings<'a>(&'a Forest);

impl Serialize for Siblings<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|node| NodeFields(node.as_ref())))
    }
}

struct NodeFields<'a>(&'a TreeNode);

impl Serialize for NodeFields<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let node = self.0;
        let mut state = serializer.serialize_struct("TreeNode", 4)?;
        state.serialize_field("id", &node.id)?;
        state.serialize_field("name", &node.name)?;
        match &node.children {
            Some(children) => state.serialize_field("children", &Siblings(children))?,
            None => state.skip_field("children")?,
        }
        state.serialize_field("hasChildren", &node.has_children)?;
        state.end()
    }
}

impl FromIterator<TreeNode> for Forest {
    fn from_iter<I: IntoIterator<Item = TreeNode>>(iter: I) -> Self {
        Forest::from_nodes(iter)
    }
}

impl<'a> IntoIterator for &'a Forest {
    type Item = &'a Arc<TreeNode>;
    type IntoIter = std::slice::Iter<'a, Arc<TreeNode>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Pre-order iterator over a forest, driven by an explicit stack.
pub struct Walk<'a> {
    stack: Vec<(usize, std::slice::Iter<'a, Arc<TreeNode>>)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a Arc<TreeNode>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (depth, siblings) = self.stack.last_mut()?;
            let depth = *depth;
            match siblings.next() {
                Some(node) => {
                    if let Some(children) = &node.children {
                        self.stack.push((depth + 1, children.0.iter()));
                    }
                    return Some((depth, node));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Forest {
        Forest::from_nodes([
            TreeNode::branch(
                "a",
                "A",
                [TreeNode::leaf("a1", "A1"), TreeNode::lazy("a2", "A2")],
            ),
            TreeNode::leaf("b", "B"),
        ])
    }

    #[test]
    fn test_walk_is_preorder_with_depth() {
        let forest = sample();
        let visited: Vec<_> = forest
            .walk()
            .map(|(depth, node)| (depth, node.id.as_str().to_string()))
            .collect();
        assert_eq!(
            visited,
            vec![
                (0, "a".to_string()),
                (1, "a1".to_string()),
                (1, "a2".to_string()),
                (0, "b".to_string()),
            ]
        );
        assert_eq!(forest.node_count(), 4);
    }

    #[test]
    fn test_duplicate_ids() {
        let forest = Forest::from_nodes([
            TreeNode::branch("a", "A", [TreeNode::leaf("x", "X")]),
            TreeNode::leaf("x", "X again"),
        ]);
        assert_eq!(forest.duplicate_ids(), vec![NodeId::from("x")]);
        assert!(sample().duplicate_ids().is_empty());
    }

    #[test]
    fn test_node_constructors() {
        let lazy = TreeNode::lazy("l", "Lazy");
        assert!(lazy.needs_load());
        assert!(!lazy.is_loaded());

        let empty = TreeNode::branch("e", "Empty", []);
        assert!(empty.is_loaded());
        assert!(!empty.has_children);
        assert!(!empty.needs_load());

        let renamed = lazy.with_name("Other");
        assert_eq!(renamed.name, "Other");
        assert_eq!(renamed.id, lazy.id);
    }

    #[test]
    fn test_json_shape() {
        let json = r#"[
            {"id": "root-1", "name": "Documents", "hasChildren": true,
             "children": [{"id": "child-1-1", "name": "Project Plans", "hasChildren": false}]},
            {"id": "root-2", "name": "Images", "hasChildren": true}
        ]"#;
        let forest = Forest::from_json(json).unwrap();
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].child_count(), 1);
        assert!(forest[1].needs_load());

        let encoded = forest.to_json().unwrap();
        assert!(encoded.contains("\"hasChildren\":true"));
        assert!(!encoded.contains("\"children\":null"));
        assert_eq!(Forest::from_json(&encoded).unwrap(), forest);
    }

    /// A single chain `n0 -> n1 -> ... -> n{levels}`.
    fn chain(levels: usize) -> Forest {
        let mut node = TreeNode::leaf(format!("n{}", levels), "leaf");
        for level in (0..levels).rev() {
            node = TreeNode::branch(format!("n{}", level), "inner", [node]);
        }
        Forest::from_nodes([node])
    }

    #[test]
    fn test_deep_chain_drops_compares_and_formats() {
        let forest = chain(100_000);
        assert_eq!(forest.depth(), 100_001);
        assert_eq!(forest, chain(100_000));
        assert_ne!(forest, chain(99_999));
        assert!(format!("{:?}", forest).contains("100000:n100000 \"leaf\""));
        drop(forest);
    }

    #[test]
    fn test_drop_keeps_shared_subtrees() {
        let inner = Forest::from_nodes([TreeNode::branch(
            "x",
            "X",
            [TreeNode::leaf("x1", "X1")],
        )]);
        let outer = Forest::from_nodes([TreeNode::branch("a", "A", [])
            .with_children(inner.clone())]);

        drop(outer);
        assert_eq!(inner.node_count(), 2);
        assert_eq!(inner[0].child_count(), 1);
    }

    #[test]
    fn test_serialize_depth_limit() {
        let deepest = chain(MAX_SERIALIZE_DEPTH - 1);
        let encoded = deepest.to_json().unwrap();
        assert_eq!(Forest::from_json(&encoded).unwrap(), deepest);

        let too_deep = chain(MAX_SERIALIZE_DEPTH);
        assert!(matches!(
            too_deep.to_json(),
            Err(crate::TreeError::Serialization(_))
        ));
        assert!(serde_json::to_string(&too_deep[0]).is_err());

        assert!(chain(100_000).to_json().is_err());
    }

    #[test]
    fn test_clone_shares_allocation() {
        let forest = sample();
        let copy = forest.clone();
        assert!(forest.ptr_eq(&copy));
        assert!(!forest.ptr_eq(&sample()));
        assert_eq!(forest, sample());
    }
}
