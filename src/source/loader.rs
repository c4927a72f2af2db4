//! The asynchronous data source for lazily loaded children.

use crate::error::LoadError;
use crate::types::{NodeId, TreeNode};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

/// Latency of [`SyntheticLoader`] unless configured otherwise.
pub const DEFAULT_SYNTHETIC_LATENCY: Duration = Duration::from_millis(800);

/// Fetches the ordered children of a node.
///
/// Returned nodes must carry ids not present anywhere in the forest. A
/// returned node may itself set `has_children` to request further lazy
/// loading.
#[async_trait]
pub trait ChildLoader: Send + Sync {
    async fn fetch_children(&self, id: &NodeId) -> Result<Vec<TreeNode>, LoadError>;
}

/// Adapts an async closure into a [`ChildLoader`].
///
/// ```ignore
/// let loader = FnLoader::new(|id: NodeId| async move {
///     Ok::<_, LoadError>(vec![TreeNode::leaf(format!("{id}-0"), "first")])
/// });
/// ```
pub struct FnLoader<F>(F);

impl<F> FnLoader<F> {
    pub fn new(f: F) -> Self {
        FnLoader(f)
    }
}

#[async_trait]
impl<F, Fut> ChildLoader for FnLoader<F>
where
    F: Fn(NodeId) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<TreeNode>, LoadError>> + Send + 'static,
{
    async fn fetch_children(&self, id: &NodeId) -> Result<Vec<TreeNode>, LoadError> {
        (self.0)(id.clone()).await
    }
}

/// Serves children from a fixed table. Unknown ids fail.
#[derive(Clone, Debug, Default)]
pub struct MapLoader {
    children: HashMap<NodeId, Vec<TreeNode>>,
}

impl MapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<NodeId>, children: Vec<TreeNode>) -> Self {
        self.children.insert(id.into(), children);
        self
    }
}

#[async_trait]
impl ChildLoader for MapLoader {
    async fn fetch_children(&self, id: &NodeId) -> Result<Vec<TreeNode>, LoadError> {
        self.children
            .get(id)
            .cloned()
            .ok_or_else(|| format!("no children registered for {}", id).into())
    }
}

/// Simulated remote source: after a delay, every node gets one leaf and one
/// lazily loadable child, both with ids derived from the parent.
#[derive(Clone, Debug)]
pub struct SyntheticLoader {
    latency: Duration,
}

impl SyntheticLoader {
    pub fn new() -> Self {
        Self {
            latency: DEFAULT_SYNTHETIC_LATENCY,
        }
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

impl Default for SyntheticLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChildLoader for SyntheticLoader {
    async fn fetch_children(&self, id: &NodeId) -> Result<Vec<TreeNode>, LoadError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        Ok(vec![
            TreeNode::leaf(format!("{}-new-1", id), format!("New Item 1 ({})", id)),
            TreeNode::lazy(format!("{}-new-2", id), format!("New Item 2 ({})", id)),
        ])
    }
}
