//! Main TreeStore struct tying all components together.

use crate::error::{Result, TreeError};
use crate::expansion::{attach_children, ExpansionController, TogglePlan};
use crate::mutator::{self, MoveCheck};
use crate::source::{ChildLoader, IdGenerator, UuidIds};
use crate::subscriptions::{
    Change, SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
use crate::types::{Forest, NodeId, TreeNode};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Expand the parent of a node created with `add_node`.
    pub expand_parent_on_add: bool,

    /// Reject fetched children whose ids already exist in the forest.
    pub validate_fetched_ids: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            expand_parent_on_add: true,
            validate_fetched_ids: true,
        }
    }
}

/// Immutable view of the store at one point in time.
///
/// Cloning is cheap; unchanged parts are shared between consecutive snapshots.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TreeSnapshot {
    /// Incremented by every mutation.
    pub version: u64,

    pub forest: Forest,

    #[serde(flatten)]
    pub expansion: ExpansionController,
}

impl TreeSnapshot {
    pub fn expanded(&self) -> &BTreeSet<NodeId> {
        self.expansion.expanded()
    }

    pub fn loading(&self) -> &BTreeSet<NodeId> {
        self.expansion.loading()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expansion.is_expanded(id)
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.expansion.is_loading(id)
    }

    pub fn find(&self, id: &str) -> Option<&Arc<TreeNode>> {
        mutator::find(&self.forest, id)
    }
}

/// Result of [`TreeStore::toggle_node`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The node was collapsed.
    Collapsed,
    /// The node was expanded; nothing had to be fetched.
    Expanded,
    /// The node was expanded while an earlier fetch is still in flight.
    AlreadyLoading,
    /// The node was expanded and `count` fetched children were attached.
    Loaded { count: usize },
    /// The fetch finished after the node was removed; nothing was attached.
    Discarded,
}

/// The tree store.
///
/// Sole holder of mutable state. Exposes five mutations (`add_node`,
/// `remove_node`, `rename_node`, `move_node`, `toggle_node`); each one that
/// changes anything replaces the current [`TreeSnapshot`] and broadcasts the
/// change to subscribers. Share it by reference or `Arc`.
pub struct TreeStore {
    /// Store configuration.
    config: StoreConfig,

    /// Current snapshot. Never held across an await.
    state: Mutex<TreeSnapshot>,

    /// Source of lazily loaded children.
    loader: Arc<dyn ChildLoader>,

    /// Ids for nodes created by `add_node`.
    ids: Arc<dyn IdGenerator>,

    /// Change feed.
    subscriptions: SubscriptionManager,
}

impl TreeStore {
    /// Create a store with random node ids and the default configuration.
    pub fn new(forest: Forest, loader: impl ChildLoader + 'static) -> Result<Self> {
        Self::with_config(
            forest,
            Arc::new(loader),
            Arc::new(UuidIds),
            StoreConfig::default(),
        )
    }

    /// Create a store with explicit collaborators.
    ///
    /// Fails if `forest` contains the same id twice.
    pub fn with_config(
        forest: Forest,
        loader: Arc<dyn ChildLoader>,
        ids: Arc<dyn IdGenerator>,
        config: StoreConfig,
    ) -> Result<Self> {
        if let Some(duplicate) = forest.duplicate_ids().into_iter().next() {
            return Err(TreeError::DuplicateId(duplicate));
        }

        Ok(Self {
            config,
            state: Mutex::new(TreeSnapshot {
                forest,
                ..Default::default()
            }),
            loader,
            ids,
            subscriptions: SubscriptionManager::new(),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // --- Read Surface ---

    /// The current snapshot.
    pub fn snapshot(&self) -> TreeSnapshot {
        self.state.lock().clone()
    }

    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    pub fn find(&self, id: &str) -> Option<Arc<TreeNode>> {
        mutator::find(&self.state.lock().forest, id).cloned()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.state.lock().is_expanded(id)
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.state.lock().is_loading(id)
    }

    /// Subscribe to changes.
    ///
    /// The initial snapshot (if requested) is taken under the same lock as
    /// mutations, so no change is missed or seen twice.
    pub fn subscribe(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle> {
        let state = self.state.lock();
        self.subscriptions.subscribe(config, &state)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.unsubscribe(id);
    }

    // --- Write Surface ---

    /// Create a leaf named `name` under `parent_id`, or at the top level when
    /// `parent_id` is `None`.
    ///
    /// Returns the new node's id, or `None` if the parent does not exist.
    /// Fails only if the id generator produced an id already in use.
    pub fn add_node(
        &self,
        parent_id: Option<&str>,
        name: impl Into<String>,
    ) -> Result<Option<NodeId>> {
        let id = self.ids.next_id();
        let mut state = self.state.lock();

        if mutator::contains(&state.forest, id.as_str()) {
            warn!(node = %id, "Generated id already in use");
            return Err(TreeError::DuplicateId(id));
        }

        let node = TreeNode::leaf(id.clone(), name);
        let forest = mutator::insert(&state.forest, parent_id, node);
        if forest.ptr_eq(&state.forest) {
            debug!(parent = ?parent_id, "Parent not found, node not added");
            return Ok(None);
        }
        state.forest = forest;

        let expanded_parent = match parent_id {
            Some(parent_id) if self.config.expand_parent_on_add => {
                state.expansion.expand(parent_id)
            }
            _ => false,
        };

        debug!(node = %id, parent = ?parent_id, "Node added");
        self.commit(
            &mut state,
            Change::NodeAdded {
                parent: parent_id.map(NodeId::from),
                id: id.clone(),
                expanded_parent,
            },
        );
        Ok(Some(id))
    }

    /// Remove a node and its subtree. Returns false if `id` does not exist.
    pub fn remove_node(&self, id: &str) -> bool {
        let mut state = self.state.lock();

        let forest = mutator::remove(&state.forest, id);
        if forest.ptr_eq(&state.forest) {
            debug!(node = id, "Node not found, nothing removed");
            return false;
        }
        state.forest = forest;

        self.commit(&mut state, Change::NodeRemoved { id: NodeId::from(id) });
        true
    }

    /// Relabel a node. Returns false if `id` does not exist.
    pub fn rename_node(&self, id: &str, name: impl Into<String>) -> bool {
        let name = name.into();
        let mut state = self.state.lock();

        let forest = mutator::update(&state.forest, id, |node| node.with_name(name.clone()));
        if forest.ptr_eq(&state.forest) {
            debug!(node = id, "Node not found, nothing renamed");
            return false;
        }
        state.forest = forest;

        self.commit(
            &mut state,
            Change::NodeRenamed {
                id: NodeId::from(id),
                name,
            },
        );
        true
    }

    /// Move `active_id` to sit immediately before `over_id`.
    ///
    /// Returns false without touching the tree when either node is missing,
    /// when both ids are equal, or when `over_id` lies inside the subtree of
    /// `active_id`.
    pub fn move_node(&self, active_id: &str, over_id: &str) -> bool {
        if active_id == over_id {
            return false;
        }

        let mut state = self.state.lock();

        let check = mutator::check_move(&state.forest, active_id, over_id);
        if check != MoveCheck::Allowed {
            debug!(active = active_id, over = over_id, ?check, "Move rejected");
            return false;
        }
        state.forest = mutator::move_node(&state.forest, active_id, over_id);

        self.commit(
            &mut state,
            Change::NodeMoved {
                id: NodeId::from(active_id),
                before: NodeId::from(over_id),
            },
        );
        true
    }

    /// Flip the expansion of `id`, fetching its children on first expansion.
    ///
    /// A fetch starts only when the node hints at children, has none loaded,
    /// and no fetch for it is already in flight. The loading mark is cleared
    /// however the fetch ends, even if this future is dropped. On failure the
    /// node is left unloaded so a later toggle retries.
    pub async fn toggle_node(&self, id: &str) -> Result<ToggleOutcome> {
        let plan = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let plan = state.expansion.begin_toggle(&state.forest, id);
            let node = NodeId::from(id);
            let change = match plan {
                TogglePlan::Collapse => Change::Collapsed { id: node },
                TogglePlan::Expand | TogglePlan::AlreadyLoading => Change::Expanded { id: node },
                TogglePlan::Fetch => Change::LoadStarted { id: node },
            };
            self.commit(state, change);
            plan
        };

        match plan {
            TogglePlan::Collapse => Ok(ToggleOutcome::Collapsed),
            TogglePlan::Expand => Ok(ToggleOutcome::Expanded),
            TogglePlan::AlreadyLoading => {
                debug!(node = id, "Fetch already in flight");
                Ok(ToggleOutcome::AlreadyLoading)
            }
            TogglePlan::Fetch => self.load_children(NodeId::from(id)).await,
        }
    }

    // --- Internal ---

    async fn load_children(&self, id: NodeId) -> Result<ToggleOutcome> {
        let mut loading = LoadingGuard::new(self, id.clone());

        info!(node = %id, "Fetching children");
        let fetched = self.loader.fetch_children(&id).await;

        let mut state = self.state.lock();
        state.expansion.finish_load(id.as_str());
        loading.disarm();

        let children = match fetched {
            Ok(children) => children,
            Err(source) => {
                warn!(node = %id, error = %source, "Fetching children failed");
                let error = source.to_string();
                self.commit(&mut state, Change::LoadFailed { id: id.clone(), error });
                return Err(TreeError::Fetch { id, source });
            }
        };

        let count = children.len();
        let attached = attach_children(
            &state.forest,
            id.as_str(),
            children,
            self.config.validate_fetched_ids,
        );
        match attached {
            Ok(Some(forest)) => {
                state.forest = forest;
                info!(node = %id, count, "Children loaded");
                self.commit(&mut state, Change::LoadCompleted { id, count });
                Ok(ToggleOutcome::Loaded { count })
            }
            Ok(None) => {
                debug!(node = %id, "Node removed while loading, result discarded");
                self.commit(&mut state, Change::LoadDiscarded { id });
                Ok(ToggleOutcome::Discarded)
            }
            Err(e) => {
                warn!(node = %id, error = %e, "Rejected fetched children");
                self.commit(
                    &mut state,
                    Change::LoadFailed {
                        id,
                        error: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    /// Publish the current state as a new version.
    fn commit(&self, state: &mut TreeSnapshot, change: Change) {
        state.version += 1;
        self.subscriptions.publish(&change, state);
    }
}

/// Clears a loading mark if the fetch future is dropped before settling.
struct LoadingGuard<'a> {
    store: &'a TreeStore,
    id: NodeId,
    armed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn new(store: &'a TreeStore, id: NodeId) -> Self {
        Self {
            store,
            id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.store.state.lock();
        if state.expansion.finish_load(self.id.as_str()) {
            debug!(node = %self.id, "Fetch abandoned");
            self.store.commit(
                &mut state,
                Change::LoadDiscarded {
                    id: self.id.clone(),
                },
            );
        }
    }
}
