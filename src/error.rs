//! Error types for the tree store.

use crate::types::NodeId;
use thiserror::Error;

/// Error produced by a [`ChildLoader`](crate::source::ChildLoader).
pub type LoadError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for store operations.
///
/// Structural no-ops (unknown ids, rejected moves) are not errors; they are
/// reported through return values.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Failed to fetch children of {id}: {source}")]
    Fetch {
        id: NodeId,
        #[source]
        source: LoadError,
    },

    #[error("Duplicate node id: {0}")]
    DuplicateId(NodeId),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Subscription dropped")]
    SubscriptionDropped,
}

impl TreeError {
    /// Whether retrying the same toggle may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TreeError::Fetch { .. })
    }
}

impl From<serde_json::Error> for TreeError {
    fn from(e: serde_json::Error) -> Self {
        TreeError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, TreeError>;
