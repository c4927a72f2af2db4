//! Demo data for examples, tests and benches.

use crate::types::{Forest, TreeNode};

/// Three roots: a loaded folder with one lazy child, a lazy folder and a leaf.
///
/// ```text
/// root-1 "Documents"
/// ├── child-1-1 "Project Plans"
/// └── child-1-2 "Design Assets"  (lazy)
/// root-2 "Images"                 (lazy)
/// root-3 "System"
/// ```
pub fn sample_forest() -> Forest {
    Forest::from_nodes([
        TreeNode::branch(
            "root-1",
            "Documents",
            [
                TreeNode::leaf("child-1-1", "Project Plans"),
                TreeNode::lazy("child-1-2", "Design Assets"),
            ],
        ),
        TreeNode::lazy("root-2", "Images"),
        TreeNode::leaf("root-3", "System"),
    ])
}
