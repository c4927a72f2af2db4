//! Index paths into a forest and path-copying rewrites.

use crate::types::{Forest, TreeNode};
use std::sync::Arc;

/// Sibling indices from the top level down to a node.
pub(crate) type IndexPath = Vec<usize>;

/// Locate the first node with `id` in pre-order.
pub(crate) fn locate(forest: &Forest, id: &str) -> Option<IndexPath> {
    // Each frame is a sibling sequence and the index of the next node to visit.
    let mut stack: Vec<(&Forest, usize)> = vec![(forest, 0)];

    loop {
        let (siblings, cursor) = stack.last_mut()?;
        let siblings: &Forest = *siblings;
        if *cursor >= siblings.len() {
            stack.pop();
            continue;
        }

        let index = *cursor;
        *cursor += 1;
        let node = &siblings[index];

        if node.id.as_str() == id {
            return Some(stack.iter().map(|(_, next)| next - 1).collect());
        }
        if let Some(children) = &node.children {
            stack.push((children, 0));
        }
    }
}

/// Rewrite the sibling sequence owned by the node at `owner` (the top level
/// when `owner` is empty).
///
/// Every node on the path is shallow-copied; every other subtree is shared
/// with the input. An absent child sequence is edited as an empty one. If the
/// edit grows the sequence, the owner's `has_children` becomes true.
pub(crate) fn splice<F>(forest: &Forest, owner: &[usize], edit: F) -> Forest
where
    F: FnOnce(&[Arc<TreeNode>]) -> Vec<Arc<TreeNode>>,
{
    let mut chain: Vec<(&Forest, usize)> = Vec::with_capacity(owner.len());
    let mut current: Option<&Forest> = Some(forest);

    for &index in owner {
        let siblings = match current {
            Some(siblings) if index < siblings.len() => siblings,
            _ => return forest.clone(),
        };
        chain.push((siblings, index));
        current = siblings[index].children.as_ref();
    }

    let old: &[Arc<TreeNode>] = match current {
        Some(children) => &children[..],
        None => &[],
    };
    let old_len = old.len();
    let mut rebuilt = Forest::from_shared(edit(old));
    let grew = rebuilt.len() > old_len;

    for (depth, (siblings, index)) in chain.into_iter().enumerate().rev() {
        let mut replacement = siblings[index].with_children(rebuilt);
        if depth + 1 == owner.len() && grew {
            replacement.has_children = true;
        }

        let mut nodes = siblings.to_vec();
        nodes[index] = Arc::new(replacement);
        rebuilt = Forest::from_shared(nodes);
    }

    rebuilt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deep(levels: usize) -> Forest {
        let mut node = TreeNode::leaf(format!("n{}", levels), "leaf");
        for level in (0..levels).rev() {
            node = TreeNode::branch(format!("n{}", level), "inner", [node]);
        }
        Forest::from_nodes([node])
    }

    #[test]
    fn test_locate_nested() {
        let forest = Forest::from_nodes([
            TreeNode::leaf("a", "A"),
            TreeNode::branch("b", "B", [TreeNode::leaf("b1", "B1"), TreeNode::leaf("b2", "B2")]),
        ]);
        assert_eq!(locate(&forest, "a"), Some(vec![0]));
        assert_eq!(locate(&forest, "b2"), Some(vec![1, 1]));
        assert_eq!(locate(&forest, "missing"), None);
    }

    #[test]
    fn test_locate_survives_deep_trees() {
        let forest = deep(100_000);
        let path = locate(&forest, "n100000").unwrap();
        assert_eq!(path.len(), 100_001);
        assert!(path.iter().all(|&index| index == 0));
    }

    #[test]
    fn test_splice_top_level() {
        let forest = Forest::from_nodes([TreeNode::leaf("a", "A")]);
        let result = splice(&forest, &[], |siblings| {
            let mut nodes = siblings.to_vec();
            nodes.push(Arc::new(TreeNode::leaf("b", "B")));
            nodes
        });
        assert_eq!(result.len(), 2);
        assert!(Arc::ptr_eq(&forest[0], &result[0]));
    }

    #[test]
    fn test_splice_sets_has_children_on_growth() {
        let forest = Forest::from_nodes([TreeNode::leaf("a", "A")]);
        let result = splice(&forest, &[0], |siblings| {
            let mut nodes = siblings.to_vec();
            nodes.push(Arc::new(TreeNode::leaf("a1", "A1")));
            nodes
        });
        assert!(result[0].has_children);
        assert_eq!(result[0].child_count(), 1);
    }
}
