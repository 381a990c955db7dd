//! Memory-backed tree access.
//!
//! Nodes live in an arena indexed by `node_id - 1`. The arena starts with a
//! fixed number of slots and doubles whenever a write lands past its end.

use super::access_config::TreeAccessConfig;
use super::access_constants::INITIAL_ARENA_SLOTS;
use super::access_types::{TreeError, TreeResult};
use super::tree_access::{AccessState, TreeAccess};
use crate::crs::Crs;
use crate::node::{intersects, ChildLink, Node, NodeId};

/// Tree access that keeps every node in memory.
#[derive(Debug)]
pub struct MemoryTreeAccess {
    arena: Vec<Option<Node>>,
    state: AccessState,
}

impl MemoryTreeAccess {
    pub fn new(config: &TreeAccessConfig, crs: Crs) -> TreeResult<Self> {
        config.validate()?;
        Ok(Self {
            arena: vec![None; INITIAL_ARENA_SLOTS],
            state: AccessState::new(config.max_elements, config.split, config.hilbert_order, crs),
        })
    }

    /// Number of slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    /// Number of slots holding a node.
    pub fn len(&self) -> usize {
        self.arena.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.iter().all(Option::is_none)
    }

    fn slot(&self, node_id: NodeId) -> TreeResult<&Node> {
        if node_id == 0 || node_id as usize > self.arena.len() {
            return Err(TreeError::NodeOutOfRange {
                node_id,
                limit: self.arena.len() as u32,
            });
        }
        self.arena[node_id as usize - 1]
            .as_ref()
            .ok_or(TreeError::MissingNode(node_id))
    }

    fn grow_to(&mut self, node_id: NodeId) {
        let needed = node_id as usize;
        if needed <= self.arena.len() {
            return;
        }
        let mut len = self.arena.len().max(1);
        while len < needed {
            len *= 2;
        }
        log::trace!("Growing node arena from {} to {} slots", self.arena.len(), len);
        self.arena.resize(len, None);
    }
}

impl TreeAccess for MemoryTreeAccess {
    fn state(&self) -> &AccessState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut AccessState {
        &mut self.state
    }

    fn read_node(&mut self, node_id: NodeId) -> TreeResult<Node> {
        self.check_open()?;
        self.slot(node_id).cloned()
    }

    fn write_node(&mut self, node: &Node) -> TreeResult<()> {
        self.check_open()?;
        if node.node_id == 0 {
            return Err(TreeError::NodeOutOfRange {
                node_id: 0,
                limit: self.arena.len() as u32,
            });
        }
        let boundary_len = self.state.boundary_len();
        if let Some(boundary) = &node.boundary {
            if boundary.len() != boundary_len {
                return Err(TreeError::BoundaryLength {
                    expected: boundary_len,
                    found: boundary.len(),
                });
            }
        }

        node.check_links()?;

        self.grow_to(node.node_id);
        self.arena[node.node_id as usize - 1] = Some(node.filled(boundary_len));
        self.state.note_written(node);
        Ok(())
    }

    fn remove_node(&mut self, node: &Node) -> TreeResult<()> {
        self.check_open()?;
        self.slot(node.node_id)?;
        self.arena[node.node_id as usize - 1] = None;
        self.state.recycle(node.node_id);
        Ok(())
    }

    fn internal_search(
        &mut self,
        start: NodeId,
        region: &[f64],
        results: &mut Vec<u32>,
    ) -> TreeResult<()> {
        self.check_open()?;
        let mut stack = vec![start];
        let mut budget = self.arena.len();

        while let Some(node_id) = stack.pop() {
            if budget == 0 {
                return Err(TreeError::CorruptLink { node_id });
            }
            budget -= 1;
            let node = self.slot(node_id)?;

            if node.sibling_id != 0 {
                stack.push(node.sibling_id);
            }
            let hit = node
                .boundary
                .as_deref()
                .is_some_and(|boundary| intersects(boundary, region));
            if hit {
                match node.child {
                    ChildLink::Data(data_id) => results.push(data_id),
                    ChildLink::Node(child_id) => stack.push(child_id),
                    ChildLink::None => return Err(TreeError::CorruptLink { node_id }),
                }
            }
        }
        Ok(())
    }

    fn rewind(&mut self) -> TreeResult<()> {
        self.check_open()?;
        self.arena = vec![None; INITIAL_ARENA_SLOTS];
        self.state.reset();
        log::debug!("Rewound in-memory tree");
        Ok(())
    }

    fn close(&mut self) -> TreeResult<()> {
        if !self.state.is_closed() {
            self.arena = Vec::new();
            self.state.mark_closed();
            log::debug!("Closed in-memory tree");
        }
        Ok(())
    }
}
