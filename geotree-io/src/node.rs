//! Node data model shared by every tree access implementation.
//!
//! A node is an arena entry: its links are plain node IDs with `0` reserved
//! as "no link", so a tree stays valid across process restarts.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::access::{TreeError, TreeResult};

/// 1-based identifier of a node; `0` is never a live node.
pub type NodeId = u32;

bitflags! {
    /// Packed flags stored in the properties byte of a node record.
    ///
    /// Bits outside the named flags belong to the owning tree algorithm and
    /// are carried through encode/decode untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct NodeProperties: u8 {
        /// Node whose children are data entries
        const LEAF = 0x01;
        /// Node that stands for one data record
        const DATA = 0x02;
    }
}

/// The `child` link of a node record.
///
/// On disk this is a single int32: `0` for no child, a positive node ID for
/// the first child, or the negated identifier of a data record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChildLink {
    #[default]
    None,
    Node(NodeId),
    Data(u32),
}

impl ChildLink {
    pub fn from_raw(raw: i32) -> Self {
        match raw.cmp(&0) {
            std::cmp::Ordering::Equal => ChildLink::None,
            std::cmp::Ordering::Greater => ChildLink::Node(raw as NodeId),
            std::cmp::Ordering::Less => ChildLink::Data(raw.unsigned_abs()),
        }
    }

    /// True when the link survives the int32 encoding unchanged.
    pub fn is_encodable(self) -> bool {
        match self {
            ChildLink::None => true,
            ChildLink::Node(id) => (1..=i32::MAX as u32).contains(&id),
            ChildLink::Data(id) => (1..=1 << 31).contains(&id),
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            ChildLink::None => 0,
            ChildLink::Node(id) => id as i32,
            ChildLink::Data(id) => (id as i32).wrapping_neg(),
        }
    }
}

/// One node of a spatial tree.
///
/// `boundary` holds `[min1, .., minD, max1, .., maxD]`. `None` means the
/// node has no boundary yet and is stored as the all-NaN sentinel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub node_id: NodeId,
    pub boundary: Option<Vec<f64>>,
    pub properties: NodeProperties,
    pub parent_id: NodeId,
    pub sibling_id: NodeId,
    pub child: ChildLink,
    pub child_count: u32,
}

impl Node {
    pub fn new(
        node_id: NodeId,
        boundary: Option<Vec<f64>>,
        properties: NodeProperties,
        parent_id: NodeId,
        sibling_id: NodeId,
        child: ChildLink,
        child_count: u32,
    ) -> Self {
        Self {
            node_id,
            boundary,
            properties,
            parent_id,
            sibling_id,
            child,
            child_count,
        }
    }

    /// A node with no boundary, no links and no children.
    pub fn empty(node_id: NodeId) -> Self {
        Self::new(
            node_id,
            None,
            NodeProperties::empty(),
            0,
            0,
            ChildLink::None,
            0,
        )
    }

    /// A data entry pointing at `data_id`.
    pub fn data_entry(node_id: NodeId, boundary: Vec<f64>, parent_id: NodeId, data_id: u32) -> Self {
        Self::new(
            node_id,
            Some(boundary),
            NodeProperties::DATA,
            parent_id,
            0,
            ChildLink::Data(data_id),
            0,
        )
    }

    pub fn is_leaf(&self) -> bool {
        self.properties.contains(NodeProperties::LEAF)
    }

    pub fn is_data(&self) -> bool {
        self.properties.contains(NodeProperties::DATA)
    }

    /// True when there is nothing to walk below this node.
    pub fn is_empty(&self) -> bool {
        self.child == ChildLink::None || self.boundary.as_deref().map_or(true, is_nan_boundary)
    }

    /// A copy whose missing boundary is replaced by the NaN sentinel.
    pub fn filled(&self, boundary_len: usize) -> Node {
        let mut node = self.clone();
        if node.boundary.is_none() {
            node.boundary = Some(nan_boundary(boundary_len));
        }
        node
    }

    /// Fails when a link or count falls outside what a record stores as int32.
    pub fn check_links(&self) -> TreeResult<()> {
        let out_of_range = |field: &'static str, value: u64| TreeError::LinkOutOfRange {
            node_id: self.node_id,
            field,
            value,
        };
        let limit = i32::MAX as u32;
        if self.node_id > limit {
            return Err(out_of_range("node_id", self.node_id.into()));
        }
        if self.parent_id > limit {
            return Err(out_of_range("parent_id", self.parent_id.into()));
        }
        if self.sibling_id > limit {
            return Err(out_of_range("sibling_id", self.sibling_id.into()));
        }
        if self.child_count > limit {
            return Err(out_of_range("child_count", self.child_count.into()));
        }
        match self.child {
            link if link.is_encodable() => Ok(()),
            ChildLink::Node(id) => Err(out_of_range("child node", id.into())),
            ChildLink::Data(id) => Err(out_of_range("data id", id.into())),
            ChildLink::None => Ok(()),
        }
    }

    /// Identifier of the data record this node points at, if any.
    pub fn data_id(&self) -> Option<u32> {
        match self.child {
            ChildLink::Data(id) => Some(id),
            _ => None,
        }
    }
}

impl PartialEq for Node {
    /// Boundaries compare bitwise so NaN-filled boundaries are equal.
    fn eq(&self, other: &Self) -> bool {
        let same_boundary = match (&self.boundary, &other.boundary) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            _ => false,
        };
        same_boundary
            && self.node_id == other.node_id
            && self.properties == other.properties
            && self.parent_id == other.parent_id
            && self.sibling_id == other.sibling_id
            && self.child == other.child
            && self.child_count == other.child_count
    }
}

/// The all-NaN boundary standing for "no boundary yet".
pub fn nan_boundary(len: usize) -> Vec<f64> {
    vec![f64::NAN; len]
}

pub fn is_nan_boundary(boundary: &[f64]) -> bool {
    boundary.iter().all(|v| v.is_nan())
}

/// Edge-inclusive intersection of two `[mins.., maxs..]` boundaries.
///
/// Symmetric in its arguments. A NaN coordinate on either side makes the
/// boxes disjoint, so NaN-filled boundaries never intersect anything.
pub fn intersects(a: &[f64], b: &[f64]) -> bool {
    if a.len() != b.len() || a.len() % 2 != 0 {
        return false;
    }
    let dim = a.len() / 2;
    (0..dim).all(|i| a[i] <= b[i + dim] && b[i] <= a[i + dim])
}
