//! Thread-safe handle over a tree access.
//!
//! Every [`TreeAccess`] operation takes `&mut self`. When several threads
//! must share one tree, wrap it in a [`SharedTreeAccess`]; each call holds
//! the lock for its whole duration.

use std::sync::Arc;

use parking_lot::Mutex;

use super::access_types::TreeResult;
use super::tree_access::TreeAccess;
use crate::node::{Node, NodeId};

/// Cloneable, lock-protected handle to a tree access.
pub struct SharedTreeAccess<A> {
    inner: Arc<Mutex<A>>,
}

impl<A> Clone for SharedTreeAccess<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: TreeAccess> SharedTreeAccess<A> {
    pub fn new(access: A) -> Self {
        Self {
            inner: Arc::new(Mutex::new(access)),
        }
    }

    pub fn read_node(&self, node_id: NodeId) -> TreeResult<Node> {
        self.inner.lock().read_node(node_id)
    }

    pub fn write_node(&self, node: &Node) -> TreeResult<()> {
        self.inner.lock().write_node(node)
    }

    pub fn remove_node(&self, node: &Node) -> TreeResult<()> {
        self.inner.lock().remove_node(node)
    }

    pub fn search(&self, region: &[f64]) -> TreeResult<Vec<u32>> {
        self.inner.lock().search(region)
    }

    pub fn new_node_id(&self) -> NodeId {
        self.inner.lock().new_node_id()
    }

    pub fn rewind(&self) -> TreeResult<()> {
        self.inner.lock().rewind()
    }

    pub fn close(&self) -> TreeResult<()> {
        self.inner.lock().close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().is_closed()
    }

    /// Runs `f` with exclusive access, for sequences that must not interleave
    /// with other threads.
    pub fn with<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Returns the inner access if this is the last handle.
    pub fn try_unwrap(self) -> Result<A, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}
