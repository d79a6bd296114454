//! Tree manager and update protocol
//!
//! A [`Manager`] owns at most one live tree built from its
//! [`ContentSource`]. Each [`Manager::update`] call makes at most one build
//! attempt and reports what happened as an [`UpdateOutcome`]; a source that
//! changed while the snapshot was being parsed yields
//! [`UpdateOutcome::Retry`] and the caller schedules the next attempt.

use std::cell::Cell;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, trace, warn};

use crate::config::ManagerConfig;
use crate::dom::{NodeId, NodeRef, NodeTree};
use crate::error::{BuildError, SourceError};
use crate::query::{self, navigate, CriteriaCache, Navigation, Query};
use crate::sax::build_tree;

/// Process-unique manager identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManagerId(u64);

impl ManagerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ManagerId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "manager-{}", self.0)
    }
}

/// Monotonic stamp of a successful build, per manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BuildId(u64);

impl BuildId {
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerState {
    NotReady,
    Building,
    Ready,
    /// The source changed during the last build
    Stale,
    Terminated,
}

/// Host collaborator providing markup snapshots and caret control
pub trait ContentSource {
    /// Whether the source can currently be read
    fn is_ready(&self) -> bool;

    /// Total extent of the content, used to detect mutation
    fn extent(&self) -> Result<usize, SourceError>;

    /// Markup snapshot of the whole content
    fn snapshot(&self) -> Result<String, SourceError>;

    /// Current caret offset
    fn caret_offset(&self) -> Result<usize, SourceError>;

    /// Place the selection over `range` (empty range collapses the caret)
    fn set_selection(&mut self, range: Range<usize>) -> Result<(), SourceError>;

    /// Activate the content spanning `range`
    fn activate(&mut self, range: Range<usize>) -> Result<(), SourceError> {
        let _ = range;
        Err(SourceError::Probe("activation not supported".to_string()))
    }
}

/// Result of one [`Manager::update`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Extent matches the last successful build; nothing rebuilt
    Unchanged,
    /// A new tree is live
    Ready(BuildId),
    /// The source changed during the build; try again later
    Retry,
    /// The source is missing, unready, or failed to answer
    Unavailable,
    Failed(BuildError),
}

/// Receives manager lifecycle signals
pub trait ManagerObserver {
    fn tree_ready(&mut self, manager: ManagerId, build: BuildId) {
        let _ = (manager, build);
    }

    fn retry_requested(&mut self, manager: ManagerId) {
        let _ = manager;
    }

    fn manager_terminated(&mut self, manager: ManagerId) {
        let _ = manager;
    }
}

/// Why the caret is being moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveReason {
    Focus = 0,
    Navigation = 1,
    Shortcut = 2,
}

/// Invoked after the caret has been placed on a node
pub type MoveCallback = Box<dyn FnMut(NodeRef<'_>, MoveReason)>;

/// Owner of the live tree for one content source
pub struct Manager<S> {
    id: ManagerId,
    config: ManagerConfig,
    source: Option<S>,
    tree: Option<NodeTree>,
    state: Cell<ManagerState>,
    build_id: Option<BuildId>,
    builds: u64,
    /// Extent recorded by the last successful build
    last_extent: Option<usize>,
    current: Cell<Option<NodeId>>,
    criteria: CriteriaCache,
    observers: Vec<Box<dyn ManagerObserver>>,
    on_move: Option<MoveCallback>,
}

impl<S> Manager<S> {
    /// Tear down the live tree, if any
    fn discard_tree(&mut self) {
        if let Some(mut tree) = self.tree.take() {
            let released = tree.teardown();
            trace!(manager = %self.id, released, "tree torn down");
        }
        self.build_id = None;
        self.last_extent = None;
        self.current.set(None);
    }
}

impl<S> Drop for Manager<S> {
    fn drop(&mut self) {
        self.discard_tree();
    }
}

impl<S: ContentSource> Manager<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, ManagerConfig::default())
    }

    pub fn with_config(source: S, config: ManagerConfig) -> Self {
        let criteria = CriteriaCache::new(config.cache_capacity());
        Manager {
            id: ManagerId::next(),
            config,
            source: Some(source),
            tree: None,
            state: Cell::new(ManagerState::NotReady),
            build_id: None,
            builds: 0,
            last_extent: None,
            current: Cell::new(None),
            criteria,
            observers: Vec::new(),
            on_move: None,
        }
    }

    #[inline]
    pub fn id(&self) -> ManagerId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> ManagerState {
        self.state.get()
    }

    /// Stamp of the live tree
    #[inline]
    pub fn build_id(&self) -> Option<BuildId> {
        self.build_id
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> Option<&mut S> {
        self.source.as_mut()
    }

    pub fn add_observer(&mut self, observer: impl ManagerObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn set_move_callback<F>(&mut self, callback: F)
    where
        F: FnMut(NodeRef<'_>, MoveReason) + 'static,
    {
        self.on_move = Some(Box::new(callback));
    }

    /// Rebuild the tree if the source changed since the last build
    pub fn update(&mut self) -> UpdateOutcome {
        if self.state.get() == ManagerState::Terminated {
            return UpdateOutcome::Unavailable;
        }

        let (before, snapshot) = {
            let Some(source) = self.source.as_ref().filter(|s| s.is_ready()) else {
                debug!(manager = %self.id, "content source not ready");
                self.state.set(ManagerState::NotReady);
                return UpdateOutcome::Unavailable;
            };
            let before = match source.extent() {
                Ok(extent) => extent,
                Err(err) => {
                    warn!(manager = %self.id, error = %err, "extent probe failed");
                    self.state.set(ManagerState::NotReady);
                    return UpdateOutcome::Unavailable;
                }
            };

            if self.tree.is_some() && self.last_extent == Some(before) {
                self.state.set(ManagerState::Ready);
                return UpdateOutcome::Unchanged;
            }

            self.state.set(ManagerState::Building);
            match source.snapshot() {
                Ok(snapshot) => (before, snapshot),
                Err(err) => {
                    warn!(manager = %self.id, error = %err, "snapshot failed");
                    self.state.set(ManagerState::NotReady);
                    return UpdateOutcome::Unavailable;
                }
            }
        };

        self.discard_tree();
        if snapshot.trim().is_empty() {
            warn!(manager = %self.id, "empty snapshot");
            self.state.set(ManagerState::NotReady);
            return UpdateOutcome::Failed(BuildError::Empty);
        }

        let mut tree = match build_tree(&snapshot) {
            Ok(tree) => tree,
            Err(err) => {
                warn!(manager = %self.id, error = %err, "tree build failed");
                self.state.set(ManagerState::NotReady);
                return UpdateOutcome::Failed(err);
            }
        };

        let after = self.source.as_ref().map(|s| s.extent());
        if !matches!(after, Some(Ok(extent)) if extent == before) {
            tree.teardown();
            self.state.set(ManagerState::Stale);
            info!(
                manager = %self.id,
                before,
                after = ?after,
                "content changed during build, retry needed"
            );
            for observer in &mut self.observers {
                observer.retry_requested(self.id);
            }
            return UpdateOutcome::Retry;
        }

        self.builds += 1;
        let build = BuildId(self.builds);
        tree.set_owner(self.id);
        let nodes = tree.len();
        self.tree = Some(tree);
        self.build_id = Some(build);
        self.last_extent = Some(before);
        self.state.set(ManagerState::Ready);
        self.current.set(self.caret_node().map(|n| n.id()));

        debug!(manager = %self.id, build = build.get(), nodes, extent = before, "tree ready");
        for observer in &mut self.observers {
            observer.tree_ready(self.id, build);
        }
        UpdateOutcome::Ready(build)
    }

    /// Ready state and a readable source; an unreadable source demotes the
    /// manager to NotReady
    pub fn is_ready(&self) -> bool {
        if self.state.get() != ManagerState::Ready || self.tree.is_none() {
            return false;
        }
        let readable = self.source.as_ref().is_some_and(|s| s.is_ready());
        if !readable {
            debug!(manager = %self.id, "content source became unreadable");
            self.state.set(ManagerState::NotReady);
        }
        readable
    }

    /// Release the tree and the source; the manager stays unavailable
    pub fn terminate(&mut self) {
        if self.state.get() == ManagerState::Terminated {
            return;
        }
        for observer in &mut self.observers {
            observer.manager_terminated(self.id);
        }
        self.discard_tree();
        self.source = None;
        self.observers.clear();
        self.on_move = None;
        self.state.set(ManagerState::Terminated);
        info!(manager = %self.id, "manager terminated");
    }

    /// The live tree, when ready
    pub fn tree(&self) -> Option<&NodeTree> {
        if self.is_ready() {
            self.tree.as_ref()
        } else {
            None
        }
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.tree()?.node(id)
    }

    /// Text leaf covering `offset`
    pub fn search_offset(&self, offset: usize) -> Option<NodeRef<'_>> {
        query::search_offset(self.tree()?.root()?, offset)
    }

    /// Text leaves containing any of `candidates`
    pub fn search_string<T: AsRef<str>>(
        &self,
        candidates: &[T],
        exclude: &[NodeId],
        max_results: Option<usize>,
    ) -> Vec<NodeRef<'_>> {
        match self.tree().and_then(|t| t.root()) {
            Some(root) => query::search_text(root, candidates, exclude, max_results),
            None => Vec::new(),
        }
    }

    /// Structured search
    pub fn search_node(&self, query: &Query) -> Vec<NodeRef<'_>> {
        let Some(tree) = self.tree() else {
            return Vec::new();
        };
        query::search_nodes(tree, &query.compile(&self.criteria))
    }

    /// Several structured searches over the same tree
    pub fn search_many(&self, queries: &[Query]) -> Vec<Vec<NodeRef<'_>>> {
        let Some(tree) = self.tree() else {
            return queries.iter().map(|_| Vec::new()).collect();
        };
        let compiled: Vec<_> = queries.iter().map(|q| q.compile(&self.criteria)).collect();
        query::search_many(tree, &compiled)
    }

    /// Text leaf under the caret
    pub fn caret_node(&self) -> Option<NodeRef<'_>> {
        let offset = self.source.as_ref()?.caret_offset().ok()?;
        self.search_offset(offset)
    }

    /// Node navigation starts from
    ///
    /// Follows the caret, as the Text leaf under it, when the caret has
    /// left the tracked node.
    pub fn current_node(&self) -> Option<NodeRef<'_>> {
        let tree = self.tree()?;
        let stored = self.current.get().and_then(|id| tree.node(id));
        let caret = self
            .source
            .as_ref()
            .and_then(|s| s.caret_offset().ok());

        match (stored, caret) {
            (Some(node), Some(offset)) if (node.offset()..node.end()).contains(&offset) => Some(node),
            (stored, Some(_)) => {
                let resolved = self.caret_node().or(stored);
                self.current.set(resolved.map(|n| n.id()));
                resolved
            }
            (stored, None) => stored,
        }
    }

    /// Track `id` as the current node; non-Control nodes resolve to their
    /// containing Control
    pub fn set_current_node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        let control = self.tree()?.node(id)?.control_ancestor()?;
        self.current.set(Some(control.id()));
        Some(control)
    }

    /// Move to the item after the current node
    pub fn next_item(&mut self) -> Option<Navigation> {
        self.step(true)
    }

    /// Move to the item before the current node
    pub fn previous_item(&mut self) -> Option<Navigation> {
        self.step(false)
    }

    fn step(&mut self, forward: bool) -> Option<Navigation> {
        let navigation = {
            let tree = self.tree()?;
            let current = self.current_node().or_else(|| tree.root())?;
            let is_stop_role = |role: &str| self.config.is_stop_role(role);
            if forward {
                navigate::next(current, is_stop_role)
            } else {
                navigate::previous(current, is_stop_role)
            }
        };
        match navigation {
            Navigation::Moved(id) => {
                self.move_to(id, MoveReason::Navigation);
            }
            Navigation::Boundary(edge) => debug!(manager = %self.id, ?edge, "navigation boundary"),
        }
        Some(navigation)
    }

    /// Collapse the caret at `id` and notify the move callback
    pub fn move_to(&mut self, id: NodeId, reason: MoveReason) -> bool {
        if !self.is_ready() {
            return false;
        }
        let Some(node) = self.tree.as_ref().and_then(|t| t.node(id)) else {
            return false;
        };
        let offset = node.offset();

        if let Some(source) = self.source.as_mut() {
            if let Err(err) = source.set_selection(offset..offset) {
                warn!(manager = %self.id, error = %err, offset, "caret placement failed");
                return false;
            }
        }
        self.current.set(Some(id));
        trace!(manager = %self.id, ?reason, offset, "moved");
        if let Some(callback) = self.on_move.as_mut() {
            callback(node, reason);
        }
        true
    }

    /// Activate the content spanned by `id`
    pub fn activate(&mut self, id: NodeId) -> bool {
        if !self.is_ready() {
            return false;
        }
        let Some(node) = self.tree.as_ref().and_then(|t| t.node(id)) else {
            return false;
        };
        let range = node.offset()..node.end();

        match self.source.as_mut().map(|s| s.activate(range)) {
            Some(Ok(())) => true,
            Some(Err(err)) => {
                warn!(manager = %self.id, error = %err, "activation failed");
                false
            }
            None => false,
        }
    }
}
