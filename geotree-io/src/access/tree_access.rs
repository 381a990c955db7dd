//! The contract every tree storage backend fulfils.
//!
//! A [`TreeAccess`] owns the nodes of one tree plus the bookkeeping around
//! them: the root, node ID allocation with recycling, and the counters the
//! owning algorithm persists. Backends only implement node I/O, the search
//! walk, rewind and close; everything else is provided on top of the shared
//! [`AccessState`].

use std::collections::BTreeSet;

use super::access_constants::INITIAL_SEARCH_CAPACITY;
use super::access_types::{SplitPolicy, TreeError, TreeResult};
use crate::crs::Crs;
use crate::node::{ChildLink, Node, NodeId, NodeProperties};

// ============================================================================
// Access State
// ============================================================================

/// Bookkeeping shared by all backends.
#[derive(Debug, Clone)]
pub struct AccessState {
    root: Option<Node>,
    max_elements: i32,
    split: SplitPolicy,
    hilbert_order: i32,
    crs: Crs,
    /// Freed IDs, smallest handed out first
    recycled: BTreeSet<NodeId>,
    /// Highest ID ever allocated or written
    node_id: NodeId,
    element_count: i32,
    tree_identifier: i32,
    closed: bool,
}

impl AccessState {
    pub fn new(max_elements: i32, split: SplitPolicy, hilbert_order: i32, crs: Crs) -> Self {
        Self {
            root: None,
            max_elements,
            split,
            hilbert_order,
            crs,
            recycled: BTreeSet::new(),
            node_id: 0,
            element_count: 0,
            tree_identifier: 0,
            closed: false,
        }
    }

    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    pub fn set_root(&mut self, root: Option<Node>) {
        self.root = root;
    }

    pub fn max_elements(&self) -> i32 {
        self.max_elements
    }

    pub fn split(&self) -> SplitPolicy {
        self.split
    }

    pub fn hilbert_order(&self) -> i32 {
        self.hilbert_order
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn boundary_len(&self) -> usize {
        self.crs.boundary_len()
    }

    /// IDs waiting to be reused, in allocation order.
    pub fn recycled_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.recycled.iter().copied()
    }

    pub fn node_id_high_water(&self) -> NodeId {
        self.node_id
    }

    /// Restores the high-water mark persisted by a previous session.
    pub fn set_node_id_high_water(&mut self, node_id: NodeId) {
        self.node_id = node_id;
    }

    pub fn element_count(&self) -> i32 {
        self.element_count
    }

    pub fn set_element_count(&mut self, element_count: i32) {
        self.element_count = element_count;
    }

    pub fn tree_identifier(&self) -> i32 {
        self.tree_identifier
    }

    pub fn set_tree_identifier(&mut self, tree_identifier: i32) {
        self.tree_identifier = tree_identifier;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Hands out the smallest recycled ID, or a fresh one past the high-water mark.
    pub fn allocate_id(&mut self) -> NodeId {
        match self.recycled.pop_first() {
            Some(id) => id,
            None => {
                self.node_id += 1;
                self.node_id
            }
        }
    }

    /// Puts `node_id` back in the pool; recycling the root node drops the root.
    pub fn recycle(&mut self, node_id: NodeId) {
        self.recycled.insert(node_id);
        if self.root.as_ref().is_some_and(|root| root.node_id == node_id) {
            self.root = None;
        }
    }

    /// Records that `node` now lives in storage.
    pub fn note_written(&mut self, node: &Node) {
        self.recycled.remove(&node.node_id);
        self.node_id = self.node_id.max(node.node_id);
        if node.node_id == 1 {
            self.root = Some(node.filled(self.boundary_len()));
        }
    }

    /// Forgets every node; the tree parameters and CRS stay.
    pub fn reset(&mut self) {
        self.root = None;
        self.recycled.clear();
        self.node_id = 0;
        self.element_count = 0;
        self.tree_identifier = 0;
    }

    pub fn mark_closed(&mut self) {
        self.closed = true;
    }
}

// ============================================================================
// Tree Access Trait
// ============================================================================

/// Node storage for one spatial tree.
///
/// Node IDs are 1-based; `0` means "no node" in every link.
pub trait TreeAccess {
    fn state(&self) -> &AccessState;

    fn state_mut(&mut self) -> &mut AccessState;

    /// Reads the node stored under `node_id`.
    fn read_node(&mut self, node_id: NodeId) -> TreeResult<Node>;

    /// Stores `node` under its own ID. A missing boundary is stored as the
    /// NaN sentinel.
    fn write_node(&mut self, node: &Node) -> TreeResult<()>;

    /// Releases the ID of `node` for reuse.
    fn remove_node(&mut self, node: &Node) -> TreeResult<()>;

    /// Walks the subtree and sibling chain starting at `start`, appending the
    /// data IDs of every entry whose boundary intersects `region`.
    ///
    /// Visiting order is pre-order: a node's child subtree is walked before
    /// its next sibling.
    fn internal_search(
        &mut self,
        start: NodeId,
        region: &[f64],
        results: &mut Vec<u32>,
    ) -> TreeResult<()>;

    /// Drops every node and starts over with an empty tree.
    fn rewind(&mut self) -> TreeResult<()>;

    /// Persists what is pending and releases the storage. Closing twice is
    /// not an error.
    fn close(&mut self) -> TreeResult<()>;

    /// Data IDs of all entries intersecting `region`.
    fn search(&mut self, region: &[f64]) -> TreeResult<Vec<u32>> {
        self.check_open()?;
        let expected = self.state().boundary_len();
        if region.len() != expected {
            return Err(TreeError::BoundaryLength {
                expected,
                found: region.len(),
            });
        }

        let start = match self.state().root() {
            Some(root) if !root.is_empty() => root.node_id,
            _ => return Ok(Vec::new()),
        };
        let mut results = Vec::with_capacity(INITIAL_SEARCH_CAPACITY);
        self.internal_search(start, region, &mut results)?;
        Ok(results)
    }

    fn check_open(&self) -> TreeResult<()> {
        if self.state().is_closed() {
            Err(TreeError::Closed)
        } else {
            Ok(())
        }
    }

    fn is_closed(&self) -> bool {
        self.state().is_closed()
    }

    fn root(&self) -> Option<&Node> {
        self.state().root()
    }

    fn set_root(&mut self, root: Option<Node>) {
        self.state_mut().set_root(root);
    }

    fn crs(&self) -> &Crs {
        self.state().crs()
    }

    fn boundary_len(&self) -> usize {
        self.state().boundary_len()
    }

    fn set_element_count(&mut self, element_count: i32) {
        self.state_mut().set_element_count(element_count);
    }

    fn set_tree_identifier(&mut self, tree_identifier: i32) {
        self.state_mut().set_tree_identifier(tree_identifier);
    }

    fn new_node_id(&mut self) -> NodeId {
        self.state_mut().allocate_id()
    }

    /// Allocates an ID and builds a node around it. Nothing is written.
    fn new_node(
        &mut self,
        boundary: Option<Vec<f64>>,
        properties: NodeProperties,
        parent_id: NodeId,
        sibling_id: NodeId,
        child: ChildLink,
        child_count: u32,
    ) -> Node {
        let node_id = self.new_node_id();
        Node::new(
            node_id,
            boundary,
            properties,
            parent_id,
            sibling_id,
            child,
            child_count,
        )
    }
}
