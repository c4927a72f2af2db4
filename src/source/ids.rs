//! Id generation for nodes created by the store.

use crate::types::NodeId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Produces ids with effectively zero collision probability.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> NodeId;
}

/// Random v4 UUIDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> NodeId {
        NodeId(uuid::Uuid::new_v4().to_string())
    }
}

/// `{prefix}-{n}` with a monotonically increasing counter starting at 1.
///
/// Deterministic, so only collision-free while the prefix is not used by any
/// other id source.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> NodeId {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        NodeId(format!("{}-{}", self.prefix, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uuid_ids_are_distinct() {
        let ids = UuidIds;
        let generated: HashSet<_> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(generated.len(), 1000);
    }

    #[test]
    fn test_sequential_ids() {
        let ids = SequentialIds::new("node");
        assert_eq!(ids.next_id(), NodeId::from("node-1"));
        assert_eq!(ids.next_id(), NodeId::from("node-2"));
    }
}
